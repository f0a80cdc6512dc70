//! SQLite connection bootstrap: schema migration and seed data.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::{settings_store, user_store};

/// Connection shared by every store. Calls are short; async callers hop onto
/// the blocking pool before locking.
pub type SharedConnection = Arc<Mutex<Connection>>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    email            TEXT    NOT NULL UNIQUE,
    status           INTEGER NOT NULL DEFAULT 0,
    member_expire_at INTEGER,
    created_at       INTEGER NOT NULL,
    updated_at       INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS roles (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT    NOT NULL UNIQUE,
    name TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, role_id)
);

CREATE TABLE IF NOT EXISTS api_tokens (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash TEXT    NOT NULL UNIQUE,
    label      TEXT    NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    revoked_at INTEGER
);

CREATE TABLE IF NOT EXISTS articles (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    title                   TEXT    NOT NULL,
    slug                    TEXT    NOT NULL UNIQUE,
    content                 TEXT    NOT NULL,
    author_id               INTEGER NOT NULL REFERENCES users(id),
    visibility              TEXT    NOT NULL DEFAULT 'member_full',
    preview_percentage      INTEGER NOT NULL DEFAULT 30,
    preview_min_chars       INTEGER NOT NULL DEFAULT 200,
    preview_smart_paragraph INTEGER NOT NULL DEFAULT 1,
    status                  INTEGER NOT NULL DEFAULT 0,
    published_at            INTEGER,
    created_at              INTEGER NOT NULL,
    updated_at              INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(status, published_at);

CREATE TABLE IF NOT EXISTS comments (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    parent_id  INTEGER REFERENCES comments(id) ON DELETE SET NULL,
    content    TEXT    NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_article ON comments(article_id, created_at);

CREATE TABLE IF NOT EXISTS settings (
    key        TEXT    PRIMARY KEY,
    value      TEXT    NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// Opens (creating if needed) the database file, migrates and seeds it.
pub fn open(path: &Path) -> Result<SharedConnection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    let journal_mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .context("failed to enable WAL")?;
    tracing::debug!(journal_mode = %journal_mode, "opened database {}", path.display());
    init(conn)
}

/// Private in-memory database, mainly for tests.
pub fn open_in_memory() -> Result<SharedConnection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    init(conn)
}

fn init(conn: Connection) -> Result<SharedConnection> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;
    conn.execute_batch(SCHEMA).context("failed to apply schema")?;

    let roles = user_store::seed_roles(&conn).context("failed to seed roles")?;
    let settings = settings_store::seed_defaults(&conn).context("failed to seed settings")?;
    if roles + settings > 0 {
        tracing::info!(roles, settings, "seeded database defaults");
    }

    Ok(Arc::new(Mutex::new(conn)))
}

/// Current time as Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
