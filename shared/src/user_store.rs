//! Users, roles, memberships and API tokens.
//!
//! This is where role codes are reduced to the [`Viewer`] capability pair the
//! visibility policy consumes.

use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    db::{now_ms, SharedConnection},
    error::BlogResult,
    visibility::Viewer,
    BlogError,
};

/// Anonymous reader.
pub const ROLE_GUEST: &str = "guest";
/// Signed-in reader.
pub const ROLE_USER: &str = "user";
/// Paying member.
pub const ROLE_MEMBER: &str = "member";
/// Site administrator.
pub const ROLE_ADMIN: &str = "admin";

const ROLE_DEFINITIONS: &[(&str, &str)] = &[
    (ROLE_GUEST, "Guest"),
    (ROLE_USER, "User"),
    (ROLE_MEMBER, "Member"),
    (ROLE_ADMIN, "Administrator"),
];

const TOKEN_PREFIX: &str = "qk_";
const TOKEN_BYTES: usize = 32;

/// Account state. Disabled users cannot authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// May sign in.
    Active,
    /// Locked out.
    Disabled,
}

impl UserStatus {
    fn from_db(value: i64) -> Self {
        if value == 0 {
            Self::Active
        } else {
            Self::Disabled
        }
    }

    fn to_db(self) -> i64 {
        match self {
            Self::Active => 0,
            Self::Disabled => 1,
        }
    }
}

/// A user with their role codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Primary key.
    pub id: i64,
    /// Lowercased email, unique.
    pub email: String,
    /// Account state.
    pub status: UserStatus,
    /// Role codes, in seed order.
    pub roles: Vec<String>,
    /// Membership expiry, Unix milliseconds.
    pub member_expire_at: Option<i64>,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}

impl UserRecord {
    /// Whether the user holds `code`.
    pub fn has_role(&self, code: &str) -> bool {
        self.roles.iter().any(|role| role == code)
    }

    /// Holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Member role, or a membership that has not expired at `now_ms`.
    pub fn is_member_at(&self, now_ms: i64) -> bool {
        self.has_role(ROLE_MEMBER) || self.member_expire_at.is_some_and(|at| now_ms < at)
    }

    /// Capabilities handed to the visibility policy.
    pub fn viewer(&self, now_ms: i64) -> Viewer {
        Viewer {
            is_admin: self.is_admin(),
            is_member: self.is_member_at(now_ms),
        }
    }
}

/// Input for [`UserStore::create_user`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUserInput {
    /// Email address.
    pub email: String,
    /// Role codes; empty means `user`.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Membership expiry, Unix milliseconds.
    #[serde(default)]
    pub member_expire_at: Option<i64>,
}

/// A freshly issued API token. The plaintext is only available here.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// Token row id, used for revocation.
    pub token_id: i64,
    /// Owner.
    pub user_id: i64,
    /// Free-form label.
    pub label: String,
    /// Bearer secret.
    pub token: String,
    /// Unix milliseconds.
    pub created_at: i64,
}

/// Store for users, roles and API tokens.
#[derive(Clone)]
pub struct UserStore {
    db: SharedConnection,
}

impl UserStore {
    /// Wraps the shared connection.
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }

    /// Creates a user. The email is normalized and must be unique; every role
    /// must already exist.
    pub fn create_user(&self, input: NewUserInput) -> BlogResult<UserRecord> {
        let email = normalize_email(&input.email)?;
        let roles = if input.roles.is_empty() {
            vec![ROLE_USER.to_string()]
        } else {
            input.roles
        };

        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        if find_user_id_by_email(&tx, &email)?.is_some() {
            return Err(BlogError::UserExists);
        }

        let now = now_ms();
        tx.execute(
            "INSERT INTO users (email, status, member_expire_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![email, UserStatus::Active.to_db(), input.member_expire_at, now],
        )?;
        let user_id = tx.last_insert_rowid();
        for role in &roles {
            let role_id = role_id(&tx, role)?;
            tx.execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
                params![user_id, role_id],
            )?;
        }
        let user = load_user(&tx, user_id)?.ok_or(BlogError::UserNotFound)?;
        tx.commit()?;

        tracing::info!(user_id, roles = ?user.roles, "created user");
        Ok(user)
    }

    /// Looks a user up by id.
    pub fn get_user(&self, id: i64) -> BlogResult<Option<UserRecord>> {
        let conn = self.db.lock();
        load_user(&conn, id)
    }

    /// Looks a user up by (normalized) email.
    pub fn find_by_email(&self, email: &str) -> BlogResult<Option<UserRecord>> {
        let email = email.trim().to_lowercase();
        let conn = self.db.lock();
        match find_user_id_by_email(&conn, &email)? {
            Some(id) => load_user(&conn, id),
            None => Ok(None),
        }
    }

    /// Oldest active administrator, if any.
    pub fn first_admin(&self) -> BlogResult<Option<UserRecord>> {
        let conn = self.db.lock();
        let id = conn
            .query_row(
                "SELECT u.id FROM users u
                 JOIN user_roles ur ON ur.user_id = u.id
                 JOIN roles r ON r.id = ur.role_id
                 WHERE r.code = ?1 AND u.status = ?2
                 ORDER BY u.id LIMIT 1",
                params![ROLE_ADMIN, UserStatus::Active.to_db()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        match id {
            Some(id) => load_user(&conn, id),
            None => Ok(None),
        }
    }

    /// Grants `role` to the user.
    pub fn assign_role(&self, user_id: i64, role: &str) -> BlogResult<UserRecord> {
        let conn = self.db.lock();
        ensure_user(&conn, user_id)?;
        let role_id = role_id(&conn, role)?;
        conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
            params![user_id, role_id],
        )?;
        touch_user(&conn, user_id)?;
        load_user(&conn, user_id)?.ok_or(BlogError::UserNotFound)
    }

    /// Removes `role` from the user.
    pub fn revoke_role(&self, user_id: i64, role: &str) -> BlogResult<UserRecord> {
        let conn = self.db.lock();
        ensure_user(&conn, user_id)?;
        let role_id = role_id(&conn, role)?;
        conn.execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2",
            params![user_id, role_id],
        )?;
        touch_user(&conn, user_id)?;
        load_user(&conn, user_id)?.ok_or(BlogError::UserNotFound)
    }

    /// Sets or clears the membership expiry.
    pub fn set_membership(&self, user_id: i64, expire_at: Option<i64>) -> BlogResult<UserRecord> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "UPDATE users SET member_expire_at = ?1, updated_at = ?2 WHERE id = ?3",
            params![expire_at, now_ms(), user_id],
        )?;
        if changed == 0 {
            return Err(BlogError::UserNotFound);
        }
        load_user(&conn, user_id)?.ok_or(BlogError::UserNotFound)
    }

    /// Enables or disables the account.
    pub fn set_status(&self, user_id: i64, status: UserStatus) -> BlogResult<UserRecord> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "UPDATE users SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.to_db(), now_ms(), user_id],
        )?;
        if changed == 0 {
            return Err(BlogError::UserNotFound);
        }
        load_user(&conn, user_id)?.ok_or(BlogError::UserNotFound)
    }

    /// Issues a new bearer token. Only its SHA-256 digest is stored.
    pub fn issue_token(&self, user_id: i64, label: &str) -> BlogResult<IssuedToken> {
        let mut secret = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut secret);
        let token = format!("{TOKEN_PREFIX}{}", hex::encode(secret));
        let label = label.trim().to_string();

        let conn = self.db.lock();
        ensure_user(&conn, user_id)?;
        let created_at = now_ms();
        conn.execute(
            "INSERT INTO api_tokens (user_id, token_hash, label, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, hash_token(&token), label, created_at],
        )?;
        let token_id = conn.last_insert_rowid();
        tracing::info!(user_id, token_id, "issued api token");

        Ok(IssuedToken {
            token_id,
            user_id,
            label,
            token,
            created_at,
        })
    }

    /// Revokes a token. Returns `false` when it was unknown or already
    /// revoked.
    pub fn revoke_token(&self, token_id: i64) -> BlogResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "UPDATE api_tokens SET revoked_at = ?1 WHERE id = ?2 AND revoked_at IS NULL",
            params![now_ms(), token_id],
        )?;
        Ok(changed > 0)
    }

    /// Resolves a bearer token to its active owner.
    pub fn resolve_token(&self, token: &str) -> BlogResult<Option<UserRecord>> {
        let token = token.trim();
        if !token.starts_with(TOKEN_PREFIX) {
            return Ok(None);
        }

        let conn = self.db.lock();
        let user_id = conn
            .query_row(
                "SELECT user_id FROM api_tokens WHERE token_hash = ?1 AND revoked_at IS NULL",
                params![hash_token(token)],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        Ok(load_user(&conn, user_id)?.filter(|user| user.status == UserStatus::Active))
    }
}

/// Inserts missing role rows. Returns how many were added.
pub(crate) fn seed_roles(conn: &Connection) -> rusqlite::Result<usize> {
    let mut inserted = 0;
    for (code, name) in ROLE_DEFINITIONS {
        inserted += conn.execute(
            "INSERT OR IGNORE INTO roles (code, name) VALUES (?1, ?2)",
            params![code, name],
        )?;
    }
    Ok(inserted)
}

fn normalize_email(raw: &str) -> BlogResult<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        },
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(BlogError::InvalidEmail)
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn role_id(conn: &Connection, code: &str) -> BlogResult<i64> {
    conn.query_row("SELECT id FROM roles WHERE code = ?1", params![code], |row| row.get(0))
        .optional()?
        .ok_or_else(|| BlogError::UnknownRole(code.to_string()))
}

fn find_user_id_by_email(conn: &Connection, email: &str) -> BlogResult<Option<i64>> {
    Ok(conn
        .query_row("SELECT id FROM users WHERE email = ?1", params![email], |row| row.get(0))
        .optional()?)
}

fn ensure_user(conn: &Connection, user_id: i64) -> BlogResult<()> {
    let exists = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", params![user_id], |_| Ok(()))
        .optional()?;
    exists.ok_or(BlogError::UserNotFound)
}

fn touch_user(conn: &Connection, user_id: i64) -> BlogResult<()> {
    conn.execute(
        "UPDATE users SET updated_at = ?1 WHERE id = ?2",
        params![now_ms(), user_id],
    )?;
    Ok(())
}

fn load_user(conn: &Connection, user_id: i64) -> BlogResult<Option<UserRecord>> {
    let user = conn
        .query_row(
            "SELECT id, email, status, member_expire_at, created_at, updated_at
             FROM users WHERE id = ?1",
            params![user_id],
            user_from_row,
        )
        .optional()?;
    let Some(mut user) = user else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT r.code FROM roles r
         JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = ?1
         ORDER BY r.id",
    )?;
    user.roles = stmt
        .query_map(params![user_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Some(user))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        status: UserStatus::from_db(row.get(2)?),
        roles: Vec::new(),
        member_expire_at: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, Result};

    use super::{NewUserInput, UserStatus, UserStore, ROLE_ADMIN, ROLE_MEMBER, ROLE_USER};
    use crate::{db::open_in_memory, BlogError, Viewer};

    fn store() -> Result<UserStore> {
        Ok(UserStore::new(open_in_memory()?))
    }

    fn input(email: &str, roles: &[&str]) -> NewUserInput {
        NewUserInput {
            email: email.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            member_expire_at: None,
        }
    }

    #[test]
    fn create_user_defaults_to_user_role() -> Result<()> {
        let store = store()?;
        let user = store.create_user(input("  Reader@Example.com ", &[]))?;
        assert_eq!(user.email, "reader@example.com");
        assert_eq!(user.roles, vec![ROLE_USER.to_string()]);
        assert_eq!(user.viewer(0), Viewer::USER);
        Ok(())
    }

    #[test]
    fn create_user_rejects_duplicates_and_unknown_roles() -> Result<()> {
        let store = store()?;
        store.create_user(input("a@example.com", &[]))?;
        assert!(matches!(
            store.create_user(input("A@example.com", &[])),
            Err(BlogError::UserExists)
        ));
        assert!(matches!(
            store.create_user(input("b@example.com", &["owner"])),
            Err(BlogError::UnknownRole(role)) if role == "owner"
        ));
        assert!(store.find_by_email("b@example.com")?.is_none());
        assert!(matches!(
            store.create_user(input("not-an-email", &[])),
            Err(BlogError::InvalidEmail)
        ));
        Ok(())
    }

    #[test]
    fn membership_comes_from_role_or_unexpired_expiry() -> Result<()> {
        let store = store()?;
        let user = store.create_user(input("m@example.com", &[]))?;
        assert!(!user.is_member_at(1_000));

        let user = store.set_membership(user.id, Some(2_000))?;
        assert!(user.is_member_at(1_999));
        assert!(!user.is_member_at(2_000));

        let user = store.set_membership(user.id, None)?;
        let user = store.assign_role(user.id, ROLE_MEMBER)?;
        assert!(user.is_member_at(i64::MAX));
        assert_eq!(user.viewer(0), Viewer::MEMBER);

        let user = store.revoke_role(user.id, ROLE_MEMBER)?;
        assert!(!user.is_member_at(0));
        Ok(())
    }

    #[test]
    fn tokens_resolve_until_revoked_or_disabled() -> Result<()> {
        let store = store()?;
        let admin = store.create_user(input("root@example.com", &[ROLE_ADMIN]))?;
        let issued = store.issue_token(admin.id, "laptop")?;
        assert!(issued.token.starts_with("qk_"));

        let resolved = store.resolve_token(&issued.token)?.context("token resolves")?;
        assert_eq!(resolved.id, admin.id);
        assert!(resolved.viewer(0).is_admin);
        assert!(store.resolve_token("qk_deadbeef")?.is_none());
        assert!(store.resolve_token("garbage")?.is_none());

        store.set_status(admin.id, UserStatus::Disabled)?;
        assert!(store.resolve_token(&issued.token)?.is_none());
        store.set_status(admin.id, UserStatus::Active)?;

        assert!(store.revoke_token(issued.token_id)?);
        assert!(!store.revoke_token(issued.token_id)?);
        assert!(store.resolve_token(&issued.token)?.is_none());
        Ok(())
    }

    #[test]
    fn first_admin_skips_regular_users() -> Result<()> {
        let store = store()?;
        assert!(store.first_admin()?.is_none());
        store.create_user(input("user@example.com", &[]))?;
        let admin = store.create_user(input("admin@example.com", &[ROLE_ADMIN]))?;
        assert_eq!(store.first_admin()?.map(|u| u.id), Some(admin.id));
        Ok(())
    }
}
