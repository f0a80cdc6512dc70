//! `write-article`: upsert a Markdown file into the articles table.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use quill_shared::{article_store::ArticleStore, db, user_store::UserStore, Article};

use crate::utils::{article_input, parse_markdown};

/// Writes `file` and applies its `publish` flag. Returns the stored article.
pub fn run(db_path: &Path, file: &Path, author_email: Option<&str>) -> Result<Article> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("failed to read markdown file {}", file.display()))?;
    let (frontmatter, body) = parse_markdown(&content)?;
    let input = article_input(&frontmatter, body, file)?;

    let conn = db::open(db_path)?;
    let users = UserStore::new(conn.clone());
    let author = match author_email {
        Some(email) => users
            .find_by_email(email)?
            .with_context(|| format!("no user with email `{email}`"))?,
        None => users
            .first_admin()?
            .context("no admin user exists; create one with `create-user --role admin`")?,
    };

    let articles = ArticleStore::new(conn);
    let (article, created) = articles.upsert_by_slug(author.id, input)?;
    let article = match frontmatter.publish {
        Some(true) if !article.is_published() => articles.publish(article.id)?,
        Some(false) if article.is_published() => articles.unpublish(article.id)?,
        _ => article,
    };

    tracing::info!(
        article_id = article.id,
        slug = %article.slug,
        created,
        "article written"
    );
    println!("Article {} successfully:", if created { "created" } else { "updated" });
    println!("  id:         {}", article.id);
    println!("  slug:       {}", article.slug);
    println!("  title:      {}", article.title);
    println!("  visibility: {}", article.visibility.as_str());
    println!("  status:     {:?}", article.status);
    Ok(article)
}
