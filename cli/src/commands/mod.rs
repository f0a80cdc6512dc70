//! Subcommand implementations.

pub mod init;
pub mod preview;
pub mod users;
pub mod write_article;

use anyhow::Result;

use crate::cli::{Cli, Commands};

/// Dispatches the parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { db_path } => init::run(&db_path),
        Commands::CreateUser {
            db_path,
            email,
            roles,
            member_days,
        } => users::create_user(&db_path, &email, roles, member_days).map(|_| ()),
        Commands::GrantRole {
            db_path,
            email,
            role,
        } => users::grant_role(&db_path, &email, &role).map(|_| ()),
        Commands::RevokeRole {
            db_path,
            email,
            role,
        } => users::revoke_role(&db_path, &email, &role).map(|_| ()),
        Commands::SetMembership {
            db_path,
            email,
            days,
            clear,
        } => {
            let days = if clear { None } else { days };
            users::set_membership(&db_path, &email, days).map(|_| ())
        },
        Commands::SetStatus {
            db_path,
            email,
            status,
        } => users::set_status(&db_path, &email, status).map(|_| ()),
        Commands::IssueToken {
            db_path,
            email,
            label,
        } => users::issue_token(&db_path, &email, &label).map(|_| ()),
        Commands::RevokeToken { db_path, token_id } => {
            users::revoke_token(&db_path, token_id).map(|_| ())
        },
        Commands::WriteArticle {
            db_path,
            file,
            author_email,
        } => write_article::run(&db_path, &file, author_email.as_deref()).map(|_| ()),
        Commands::Preview { file, viewer, json } => preview::run(&file, viewer, json),
    }
}
