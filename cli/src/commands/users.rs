//! User, role, membership and token commands.

use std::path::Path;

use anyhow::{Context, Result};
use quill_shared::{
    db,
    user_store::{IssuedToken, NewUserInput, UserRecord, UserStatus, UserStore},
};

use crate::{
    cli::AccountStatus,
    utils::{expiry_after_days, format_millis},
};

fn open_store(db_path: &Path) -> Result<UserStore> {
    Ok(UserStore::new(db::open(db_path)?))
}

fn find_user(store: &UserStore, email: &str) -> Result<UserRecord> {
    store
        .find_by_email(email)?
        .with_context(|| format!("no user with email `{email}`"))
}

fn print_user(action: &str, user: &UserRecord) {
    println!("{action}:");
    println!("  id:     {}", user.id);
    println!("  email:  {}", user.email);
    println!("  roles:  {}", user.roles.join(", "));
    println!("  status: {:?}", user.status);
    match user.member_expire_at {
        Some(at) => println!("  member: until {}", format_millis(at)),
        None => println!("  member: -"),
    }
}

/// `create-user`.
pub fn create_user(
    db_path: &Path,
    email: &str,
    roles: Vec<String>,
    member_days: Option<u32>,
) -> Result<UserRecord> {
    let store = open_store(db_path)?;
    let user = store.create_user(NewUserInput {
        email: email.to_string(),
        roles,
        member_expire_at: member_days.map(expiry_after_days),
    })?;
    print_user("User created", &user);
    Ok(user)
}

/// `grant-role`.
pub fn grant_role(db_path: &Path, email: &str, role: &str) -> Result<UserRecord> {
    let store = open_store(db_path)?;
    let user = find_user(&store, email)?;
    let user = store.assign_role(user.id, role)?;
    tracing::info!(user_id = user.id, role, "role granted");
    print_user("Role granted", &user);
    Ok(user)
}

/// `revoke-role`.
pub fn revoke_role(db_path: &Path, email: &str, role: &str) -> Result<UserRecord> {
    let store = open_store(db_path)?;
    let user = find_user(&store, email)?;
    let user = store.revoke_role(user.id, role)?;
    tracing::info!(user_id = user.id, role, "role revoked");
    print_user("Role revoked", &user);
    Ok(user)
}

/// `set-membership`; `None` clears the expiry.
pub fn set_membership(db_path: &Path, email: &str, days: Option<u32>) -> Result<UserRecord> {
    let store = open_store(db_path)?;
    let user = find_user(&store, email)?;
    let user = store.set_membership(user.id, days.map(expiry_after_days))?;
    print_user("Membership updated", &user);
    Ok(user)
}

/// `set-status`.
pub fn set_status(db_path: &Path, email: &str, status: AccountStatus) -> Result<UserRecord> {
    let store = open_store(db_path)?;
    let user = find_user(&store, email)?;
    let status = match status {
        AccountStatus::Active => UserStatus::Active,
        AccountStatus::Disabled => UserStatus::Disabled,
    };
    let user = store.set_status(user.id, status)?;
    print_user("Status updated", &user);
    Ok(user)
}

/// `issue-token`. The plaintext is printed once and never stored.
pub fn issue_token(db_path: &Path, email: &str, label: &str) -> Result<IssuedToken> {
    let store = open_store(db_path)?;
    let user = find_user(&store, email)?;
    let issued = store.issue_token(user.id, label)?;
    println!("Token issued for {} (id {}):", user.email, issued.token_id);
    println!("  {}", issued.token);
    println!("Store it now; it cannot be shown again.");
    Ok(issued)
}

/// `revoke-token`.
pub fn revoke_token(db_path: &Path, token_id: i64) -> Result<bool> {
    let store = open_store(db_path)?;
    let revoked = store.revoke_token(token_id)?;
    if revoked {
        println!("Token {token_id} revoked");
    } else {
        println!("Token {token_id} not found or already revoked");
    }
    Ok(revoked)
}
