//! Article persistence: slug rules, field validation, publication state and
//! the public/admin listings.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{
    db::{now_ms, SharedConnection},
    error::BlogResult,
    Article, ArticleStatus, ArticleVisibility, BlogError,
};

const MAX_TITLE_CHARS: usize = 255;

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("static slug pattern"));
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("static dash pattern"));

const ARTICLE_COLUMNS: &str = "a.id, a.title, a.slug, a.content, a.author_id, u.email, \
                               a.visibility, a.preview_percentage, a.preview_min_chars, \
                               a.preview_smart_paragraph, a.status, a.published_at, \
                               a.created_at, a.updated_at";

fn default_visibility() -> ArticleVisibility {
    ArticleVisibility::MemberFull
}

fn default_preview_percentage() -> i64 {
    30
}

fn default_preview_min_chars() -> i64 {
    200
}

fn default_smart_paragraph() -> bool {
    true
}

/// Editable article fields, as accepted by create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleInput {
    /// Display title, 1–255 code points.
    pub title: String,
    /// URL slug; normalized before validation. Empty falls back to the title.
    #[serde(default)]
    pub slug: String,
    /// Markdown body, must not be blank.
    pub content: String,
    /// Access tier.
    #[serde(default = "default_visibility")]
    pub visibility: ArticleVisibility,
    /// Preview share, 0–100.
    #[serde(default = "default_preview_percentage")]
    pub preview_percentage: i64,
    /// Preview floor in code points, non-negative.
    #[serde(default = "default_preview_min_chars")]
    pub preview_min_chars: i64,
    /// Snap preview cuts to text boundaries.
    #[serde(default = "default_smart_paragraph")]
    pub preview_smart_paragraph: bool,
}

impl Default for ArticleInput {
    fn default() -> Self {
        Self {
            title: String::new(),
            slug: String::new(),
            content: String::new(),
            visibility: default_visibility(),
            preview_percentage: default_preview_percentage(),
            preview_min_chars: default_preview_min_chars(),
            preview_smart_paragraph: default_smart_paragraph(),
        }
    }
}

/// Lowercases, trims, turns spaces into dashes and collapses dash runs.
pub fn normalize_slug(raw: &str) -> String {
    let slug = raw.trim().to_lowercase().replace(' ', "-");
    DASH_RUN.replace_all(&slug, "-").trim_matches('-').to_string()
}

/// Whether `slug` is lowercase ASCII words joined by single dashes.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}

/// Validated, storage-ready copy of an [`ArticleInput`].
struct CleanArticle {
    title: String,
    slug: String,
    content: String,
    visibility: ArticleVisibility,
    preview_percentage: i64,
    preview_min_chars: i64,
    preview_smart_paragraph: bool,
}

fn validate(input: ArticleInput) -> BlogResult<CleanArticle> {
    let title = input.title.trim().to_string();
    let title_len = title.chars().count();
    if title_len == 0 || title_len > MAX_TITLE_CHARS {
        return Err(BlogError::InvalidArticle(format!(
            "title must be 1-{MAX_TITLE_CHARS} characters"
        )));
    }
    if input.content.trim().is_empty() {
        return Err(BlogError::InvalidArticle("content must not be empty".to_string()));
    }

    let slug_source = if input.slug.trim().is_empty() {
        &title
    } else {
        &input.slug
    };
    let slug = normalize_slug(slug_source);
    if !is_valid_slug(&slug) {
        return Err(BlogError::InvalidSlug);
    }

    if !input.visibility.is_known() {
        return Err(BlogError::InvalidVisibility);
    }
    if !(0..=100).contains(&input.preview_percentage) {
        return Err(BlogError::InvalidPreviewSettings(
            "preview_percentage must be between 0 and 100".to_string(),
        ));
    }
    if input.preview_min_chars < 0 {
        return Err(BlogError::InvalidPreviewSettings(
            "preview_min_chars must not be negative".to_string(),
        ));
    }

    Ok(CleanArticle {
        title,
        slug,
        content: input.content,
        visibility: input.visibility,
        preview_percentage: input.preview_percentage,
        preview_min_chars: input.preview_min_chars,
        preview_smart_paragraph: input.preview_smart_paragraph,
    })
}

/// Store for articles.
#[derive(Clone)]
pub struct ArticleStore {
    db: SharedConnection,
}

impl ArticleStore {
    /// Wraps the shared connection.
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }

    /// Creates a draft article.
    pub fn create(&self, author_id: i64, input: ArticleInput) -> BlogResult<Article> {
        let article = validate(input)?;
        let conn = self.db.lock();
        if slug_taken(&conn, &article.slug, None)? {
            return Err(BlogError::SlugExists);
        }

        let now = now_ms();
        conn.execute(
            "INSERT INTO articles (title, slug, content, author_id, visibility,
                 preview_percentage, preview_min_chars, preview_smart_paragraph,
                 status, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10, ?10)",
            params![
                article.title,
                article.slug,
                article.content,
                author_id,
                article.visibility.as_str(),
                article.preview_percentage,
                article.preview_min_chars,
                article.preview_smart_paragraph,
                ArticleStatus::Draft.to_db(),
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(article_id = id, slug = %article.slug, "article created");
        load_by_id(&conn, id)?.ok_or(BlogError::NotFound)
    }

    /// Replaces the editable fields. Status and timestamps other than
    /// `updated_at` are kept.
    pub fn update(&self, id: i64, input: ArticleInput) -> BlogResult<Article> {
        let article = validate(input)?;
        let conn = self.db.lock();
        if load_by_id(&conn, id)?.is_none() {
            return Err(BlogError::NotFound);
        }
        if slug_taken(&conn, &article.slug, Some(id))? {
            return Err(BlogError::SlugExists);
        }

        conn.execute(
            "UPDATE articles SET title = ?1, slug = ?2, content = ?3, visibility = ?4,
                 preview_percentage = ?5, preview_min_chars = ?6,
                 preview_smart_paragraph = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                article.title,
                article.slug,
                article.content,
                article.visibility.as_str(),
                article.preview_percentage,
                article.preview_min_chars,
                article.preview_smart_paragraph,
                now_ms(),
                id,
            ],
        )?;
        tracing::info!(article_id = id, slug = %article.slug, "article updated");
        load_by_id(&conn, id)?.ok_or(BlogError::NotFound)
    }

    /// Removes the article together with its comments.
    pub fn delete(&self, id: i64) -> BlogResult<()> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM comments WHERE article_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM articles WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(BlogError::NotFound);
        }
        tx.commit()?;
        tracing::info!(article_id = id, "article deleted");
        Ok(())
    }

    /// Marks the article published as of now.
    pub fn publish(&self, id: i64) -> BlogResult<Article> {
        let now = now_ms();
        self.set_status(id, ArticleStatus::Published, Some(now))
    }

    /// Returns the article to draft. The last publication time is kept.
    pub fn unpublish(&self, id: i64) -> BlogResult<Article> {
        self.set_status(id, ArticleStatus::Draft, None)
    }

    fn set_status(
        &self,
        id: i64,
        status: ArticleStatus,
        published_at: Option<i64>,
    ) -> BlogResult<Article> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "UPDATE articles
             SET status = ?1, published_at = COALESCE(?2, published_at), updated_at = ?3
             WHERE id = ?4",
            params![status.to_db(), published_at, now_ms(), id],
        )?;
        if changed == 0 {
            return Err(BlogError::NotFound);
        }
        tracing::info!(article_id = id, status = ?status, "article status changed");
        load_by_id(&conn, id)?.ok_or(BlogError::NotFound)
    }

    /// Looks an article up by id.
    pub fn get_by_id(&self, id: i64) -> BlogResult<Option<Article>> {
        let conn = self.db.lock();
        load_by_id(&conn, id)
    }

    /// Looks an article up by slug.
    pub fn get_by_slug(&self, slug: &str) -> BlogResult<Option<Article>> {
        let conn = self.db.lock();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles a
                     LEFT JOIN users u ON u.id = a.author_id
                     WHERE a.slug = ?1"
                ),
                params![slug],
                article_from_row,
            )
            .optional()?)
    }

    /// Published articles in a guest-visible tier, newest first, plus the
    /// total count. `page` is 1-based.
    pub fn list_published(&self, page: u32, page_size: u32) -> BlogResult<(Vec<Article>, i64)> {
        let conn = self.db.lock();
        let filter = "a.status = ?1 AND a.published_at IS NOT NULL \
                      AND a.visibility IN ('public_full', 'member_full')";
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM articles a WHERE {filter}"),
            params![ArticleStatus::Published.to_db()],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a
             LEFT JOIN users u ON u.id = a.author_id
             WHERE {filter}
             ORDER BY a.published_at DESC, a.id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let (limit, offset) = page_window(page, page_size);
        let articles = stmt
            .query_map(
                params![ArticleStatus::Published.to_db(), limit, offset],
                article_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((articles, total))
    }

    /// Every article regardless of state, newest first, plus the total count.
    pub fn list_all(&self, page: u32, page_size: u32) -> BlogResult<(Vec<Article>, i64)> {
        let conn = self.db.lock();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a
             LEFT JOIN users u ON u.id = a.author_id
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT ?1 OFFSET ?2"
        ))?;
        let (limit, offset) = page_window(page, page_size);
        let articles = stmt
            .query_map(params![limit, offset], article_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((articles, total))
    }

    /// Updates the article with the input's (normalized) slug, or creates it.
    /// The flag is `true` when a new article was created.
    pub fn upsert_by_slug(&self, author_id: i64, input: ArticleInput) -> BlogResult<(Article, bool)> {
        let source = if input.slug.trim().is_empty() {
            input.title.as_str()
        } else {
            input.slug.as_str()
        };
        let slug = normalize_slug(source);
        match self.get_by_slug(&slug)? {
            Some(existing) => Ok((self.update(existing.id, input)?, false)),
            None => Ok((self.create(author_id, input)?, true)),
        }
    }
}

fn page_window(page: u32, page_size: u32) -> (i64, i64) {
    let page = i64::from(page.max(1));
    let size = i64::from(page_size);
    (size, (page - 1) * size)
}

fn slug_taken(conn: &Connection, slug: &str, exclude_id: Option<i64>) -> BlogResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM articles WHERE slug = ?1", params![slug], |row| row.get(0))
        .optional()?;
    Ok(matches!(found, Some(id) if Some(id) != exclude_id))
}

fn load_by_id(conn: &Connection, id: i64) -> BlogResult<Option<Article>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles a
                 LEFT JOIN users u ON u.id = a.author_id
                 WHERE a.id = ?1"
            ),
            params![id],
            article_from_row,
        )
        .optional()?)
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        author_id: row.get(4)?,
        author_email: row.get(5)?,
        visibility: ArticleVisibility::parse(&row.get::<_, String>(6)?),
        preview_percentage: row.get(7)?,
        preview_min_chars: row.get(8)?,
        preview_smart_paragraph: row.get(9)?,
        status: ArticleStatus::from_db(row.get(10)?),
        published_at: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
