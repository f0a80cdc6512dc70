//! Integration tests for CLI commands.

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use quill_cli::{
        cli::{AccountStatus, ViewerRole},
        commands::{init, preview, users, write_article},
    };
    use quill_shared::{db, user_store::UserStore, ArticleStatus, ArticleVisibility};
    use tempfile::TempDir;

    const MEMBER_POST: &str = "---
title: Lifetimes Explained
visibility: member_full
preview_percentage: 10
preview_min_chars: 10
publish: true
---
Lifetimes tie references to scopes.

The rest is for members: variance, subtyping and higher-ranked bounds.
";

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).expect("write markdown");
        path
    }

    fn db_path(dir: &TempDir) -> PathBuf {
        dir.path().join("data").join("quill.db")
    }

    fn bootstrap_admin(db_path: &Path) {
        init::run(db_path).expect("init");
        users::create_user(db_path, "admin@example.com", vec!["admin".to_string()], None)
            .expect("create admin");
    }

    #[test]
    fn write_article_upserts_and_applies_publish_flag() {
        let dir = TempDir::new().expect("tempdir");
        let db_path = db_path(&dir);
        bootstrap_admin(&db_path);

        let file = write_file(&dir, "lifetimes.md", MEMBER_POST);
        let article = write_article::run(&db_path, &file, None).expect("write article");
        assert_eq!(article.slug, "lifetimes");
        assert_eq!(article.title, "Lifetimes Explained");
        assert_eq!(article.visibility, ArticleVisibility::MemberFull);
        assert_eq!(article.status, ArticleStatus::Published);
        assert_eq!(article.author_email.as_deref(), Some("admin@example.com"));

        let unpublished = MEMBER_POST.replace("publish: true", "publish: false");
        std::fs::write(&file, unpublished).expect("rewrite markdown");
        let again = write_article::run(&db_path, &file, None).expect("rewrite article");
        assert_eq!(again.id, article.id);
        assert_eq!(again.status, ArticleStatus::Draft);
    }

    #[test]
    fn write_article_needs_an_author() {
        let dir = TempDir::new().expect("tempdir");
        let db_path = db_path(&dir);
        init::run(&db_path).expect("init");

        let file = write_file(&dir, "post.md", MEMBER_POST);
        assert!(write_article::run(&db_path, &file, None).is_err());
        assert!(write_article::run(&db_path, &file, Some("ghost@example.com")).is_err());
    }

    #[test]
    fn preview_masks_for_guests_only() {
        let dir = TempDir::new().expect("tempdir");
        let file = write_file(&dir, "lifetimes.md", MEMBER_POST);

        let guest = preview::render(&file, ViewerRole::Guest).expect("guest preview");
        assert!(guest.view.is_preview);
        assert_eq!(guest.view.content.trim(), "Lifetimes tie references to scopes.");
        assert!(guest.excerpt.starts_with("Lifetimes tie references"));

        let member = preview::render(&file, ViewerRole::Member).expect("member preview");
        assert!(!member.view.is_preview);
        assert_eq!(member.view.content.chars().count(), member.total_chars);
    }

    #[test]
    fn preview_of_hidden_article_fails_for_non_admins() {
        let dir = TempDir::new().expect("tempdir");
        let file = write_file(&dir, "secret.md", "---\nvisibility: hidden\n---\nSecret.\n");
        assert!(preview::render(&file, ViewerRole::User).is_err());
        assert!(preview::render(&file, ViewerRole::Admin).is_ok());
    }

    #[test]
    fn user_commands_manage_roles_membership_and_tokens() {
        let dir = TempDir::new().expect("tempdir");
        let db_path = db_path(&dir);
        init::run(&db_path).expect("init");

        let user = users::create_user(&db_path, "Reader@Example.com", Vec::new(), Some(30))
            .expect("create user");
        assert_eq!(user.email, "reader@example.com");
        assert!(user.member_expire_at.is_some());

        let user = users::set_membership(&db_path, "reader@example.com", None).expect("clear");
        assert_eq!(user.member_expire_at, None);

        let user = users::grant_role(&db_path, "reader@example.com", "member").expect("grant");
        assert!(user.has_role("member"));
        let user = users::revoke_role(&db_path, "reader@example.com", "member").expect("revoke");
        assert!(!user.has_role("member"));
        assert!(users::grant_role(&db_path, "reader@example.com", "owner").is_err());

        let issued = users::issue_token(&db_path, "reader@example.com", "laptop").expect("token");
        let store = UserStore::new(db::open(&db_path).expect("open db"));
        assert!(store.resolve_token(&issued.token).expect("resolve").is_some());

        users::set_status(&db_path, "reader@example.com", AccountStatus::Disabled)
            .expect("disable");
        assert!(store.resolve_token(&issued.token).expect("resolve").is_none());
        users::set_status(&db_path, "reader@example.com", AccountStatus::Active).expect("enable");

        assert!(users::revoke_token(&db_path, issued.token_id).expect("revoke token"));
        assert!(store.resolve_token(&issued.token).expect("resolve").is_none());
    }
}
