//! Markdown/frontmatter helpers shared by `write-article` and `preview`.

use std::path::Path;

use anyhow::{bail, Result};
use gray_matter::{engine::YAML, Matter};
use quill_shared::{
    article_store::{normalize_slug, ArticleInput},
    db::now_ms,
    Article, ArticleStatus, ArticleVisibility,
};
use serde::Deserialize;

/// YAML frontmatter recognised in article files. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct Frontmatter {
    /// Article title; falls back to the file stem.
    pub title: Option<String>,
    /// URL slug; falls back to the file stem.
    pub slug: Option<String>,
    /// `hidden`, `public_full` or `member_full`.
    pub visibility: Option<String>,
    /// Preview share, 0–100.
    pub preview_percentage: Option<i64>,
    /// Preview floor in code points.
    pub preview_min_chars: Option<i64>,
    /// Snap preview cuts to text boundaries.
    pub preview_smart_paragraph: Option<bool>,
    /// Publish (`true`) or unpublish (`false`) after writing; absent keeps
    /// the current state.
    pub publish: Option<bool>,
}

/// Splits a Markdown document into its frontmatter and body.
pub fn parse_markdown(content: &str) -> Result<(Frontmatter, String)> {
    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(content);

    let frontmatter = parsed
        .data
        .map(|data| data.deserialize::<Frontmatter>())
        .transpose()?
        .unwrap_or_default();

    Ok((frontmatter, parsed.content))
}

/// Builds the store input from parsed frontmatter. `file` supplies the
/// fallback title and slug.
pub fn article_input(frontmatter: &Frontmatter, body: String, file: &Path) -> Result<ArticleInput> {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let title = frontmatter
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map_or_else(|| stem.clone(), ToOwned::to_owned);
    let slug = frontmatter
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .map_or_else(|| stem.clone(), ToOwned::to_owned);

    let defaults = ArticleInput::default();
    let visibility = match frontmatter.visibility.as_deref() {
        Some(raw) => {
            let parsed = ArticleVisibility::parse(raw);
            if !parsed.is_known() {
                bail!("unknown visibility `{raw}`; expected hidden, public_full or member_full");
            }
            parsed
        },
        None => defaults.visibility,
    };

    Ok(ArticleInput {
        title,
        slug,
        content: body,
        visibility,
        preview_percentage: frontmatter
            .preview_percentage
            .unwrap_or(defaults.preview_percentage),
        preview_min_chars: frontmatter
            .preview_min_chars
            .unwrap_or(defaults.preview_min_chars),
        preview_smart_paragraph: frontmatter
            .preview_smart_paragraph
            .unwrap_or(defaults.preview_smart_paragraph),
    })
}

/// An unsaved, published article for local rendering.
pub fn draft_article(input: ArticleInput) -> Article {
    let now = now_ms();
    Article {
        id: 0,
        slug: normalize_slug(&input.slug),
        title: input.title,
        content: input.content,
        author_id: 0,
        author_email: None,
        visibility: input.visibility,
        preview_percentage: input.preview_percentage,
        preview_min_chars: input.preview_min_chars,
        preview_smart_paragraph: input.preview_smart_paragraph,
        status: ArticleStatus::Published,
        published_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}

/// `now + days`, in Unix milliseconds.
pub fn expiry_after_days(days: u32) -> i64 {
    now_ms().saturating_add(i64::from(days) * 86_400_000)
}

/// Human-readable UTC timestamp for Unix milliseconds.
pub fn format_millis(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}
