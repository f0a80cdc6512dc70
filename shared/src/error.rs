//! Error taxonomy shared by the engine and the stores.

use thiserror::Error;

/// Failures surfaced to the HTTP layer and the CLI.
#[derive(Debug, Error)]
pub enum BlogError {
    /// The record is absent, or the viewer may not know it exists.
    #[error("article not found")]
    NotFound,
    /// Another article already uses the slug.
    #[error("slug already exists")]
    SlugExists,
    /// The slug is empty or contains characters outside `[a-z0-9-]`.
    #[error("invalid slug format")]
    InvalidSlug,
    /// The visibility is not one of the writable tiers.
    #[error("invalid visibility: expected hidden, public_full or member_full")]
    InvalidVisibility,
    /// Preview percentage or minimum length out of range.
    #[error("invalid preview settings: {0}")]
    InvalidPreviewSettings(String),
    /// Article fields such as the title or body failed validation.
    #[error("invalid article: {0}")]
    InvalidArticle(String),
    /// Comment text is empty after trimming.
    #[error("comment is too short")]
    CommentTooShort,
    /// Comment text exceeds the length limit.
    #[error("comment is too long")]
    CommentTooLong,
    /// The comment does not exist.
    #[error("comment not found")]
    CommentNotFound,
    /// The reply target is missing or belongs to another article.
    #[error("parent comment not found")]
    ParentCommentNotFound,
    /// Only the author may delete the comment.
    #[error("not comment owner")]
    NotCommentOwner,
    /// A user with the email already exists.
    #[error("user already exists")]
    UserExists,
    /// The user does not exist.
    #[error("user not found")]
    UserNotFound,
    /// The role code is not seeded.
    #[error("unknown role: {0}")]
    UnknownRole(String),
    /// The email address is malformed.
    #[error("invalid email address")]
    InvalidEmail,
    /// SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result alias for store and engine operations.
pub type BlogResult<T> = Result<T, BlogError>;
