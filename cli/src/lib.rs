//! Administration CLI for Quill: database bootstrap, user and token
//! management, Markdown article import and local preview rendering.

pub mod cli;
pub mod commands;
pub mod utils;
