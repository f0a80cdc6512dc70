//! Command-line surface.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use quill_shared::Viewer;

/// Viewer identity used when rendering a local preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewerRole {
    /// Not signed in.
    Guest,
    /// Signed in without membership.
    User,
    /// Active member.
    Member,
    /// Administrator.
    Admin,
}

impl ViewerRole {
    /// Capabilities for this role; `None` for a guest.
    pub fn viewer(self) -> Option<Viewer> {
        match self {
            Self::Guest => None,
            Self::User => Some(Viewer::USER),
            Self::Member => Some(Viewer::MEMBER),
            Self::Admin => Some(Viewer::ADMIN),
        }
    }
}

/// Account state accepted by `set-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccountStatus {
    /// Tokens resolve normally.
    Active,
    /// Tokens are rejected.
    Disabled,
}

/// Top-level parser.
#[derive(Parser)]
#[command(name = "quill-cli", version, about = "Quill blog administration CLI")]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Every `quill-cli` subcommand.
#[derive(Subcommand)]
pub enum Commands {
    /// Create the SQLite schema and seed roles and settings.
    Init {
        /// SQLite database path.
        #[arg(long, default_value = "./data/quill.db")]
        db_path: PathBuf,
    },
    /// Create a user account.
    CreateUser {
        /// SQLite database path.
        #[arg(long, default_value = "./data/quill.db")]
        db_path: PathBuf,
        /// Email address (case-insensitive, unique).
        #[arg(long)]
        email: String,
        /// Role code; repeat for several. Defaults to `user`.
        #[arg(long = "role")]
        roles: Vec<String>,
        /// Grant a membership that expires after this many days.
        #[arg(long)]
        member_days: Option<u32>,
    },
    /// Grant a role to a user.
    GrantRole {
        /// SQLite database path.
        #[arg(long, default_value = "./data/quill.db")]
        db_path: PathBuf,
        /// User email.
        #[arg(long)]
        email: String,
        /// Role code (`guest`, `user`, `member`, `admin`).
        #[arg(long)]
        role: String,
    },
    /// Remove a role from a user.
    RevokeRole {
        /// SQLite database path.
        #[arg(long, default_value = "./data/quill.db")]
        db_path: PathBuf,
        /// User email.
        #[arg(long)]
        email: String,
        /// Role code.
        #[arg(long)]
        role: String,
    },
    /// Set or clear a time-limited membership.
    #[command(group(ArgGroup::new("membership").required(true).args(["days", "clear"])))]
    SetMembership {
        /// SQLite database path.
        #[arg(long, default_value = "./data/quill.db")]
        db_path: PathBuf,
        /// User email.
        #[arg(long)]
        email: String,
        /// Membership length from now, in days.
        #[arg(long)]
        days: Option<u32>,
        /// Remove the membership expiry.
        #[arg(long)]
        clear: bool,
    },
    /// Enable or disable an account.
    SetStatus {
        /// SQLite database path.
        #[arg(long, default_value = "./data/quill.db")]
        db_path: PathBuf,
        /// User email.
        #[arg(long)]
        email: String,
        /// New account state.
        #[arg(long, value_enum)]
        status: AccountStatus,
    },
    /// Issue an API token and print it once.
    IssueToken {
        /// SQLite database path.
        #[arg(long, default_value = "./data/quill.db")]
        db_path: PathBuf,
        /// User email.
        #[arg(long)]
        email: String,
        /// Free-form label shown in listings.
        #[arg(long, default_value = "cli")]
        label: String,
    },
    /// Revoke an API token by id.
    RevokeToken {
        /// SQLite database path.
        #[arg(long, default_value = "./data/quill.db")]
        db_path: PathBuf,
        /// Token id printed by `issue-token`.
        #[arg(long)]
        token_id: i64,
    },
    /// Create or update an article from a Markdown file with YAML frontmatter.
    WriteArticle {
        /// SQLite database path.
        #[arg(long, default_value = "./data/quill.db")]
        db_path: PathBuf,
        /// Markdown file path.
        #[arg(long)]
        file: PathBuf,
        /// Author email (defaults to the first administrator).
        #[arg(long)]
        author_email: Option<String>,
    },
    /// Render a Markdown file the way a given viewer would receive it.
    Preview {
        /// Markdown file path.
        #[arg(long)]
        file: PathBuf,
        /// Viewer to render for.
        #[arg(long = "as", value_enum, default_value = "guest")]
        viewer: ViewerRole,
        /// Print the rendered article as JSON.
        #[arg(long)]
        json: bool,
    },
}
