//! Shared data models, the article visibility & preview engine, and the
//! SQLite-backed stores used by the Quill backend and CLI.

pub mod article_store;
pub mod comments_store;
pub mod db;
pub mod error;
pub mod excerpt;
pub mod preview;
pub mod render;
pub mod settings_store;
pub mod user_store;
pub mod visibility;

use serde::{Deserialize, Serialize};

pub use error::BlogError;
pub use excerpt::generate_excerpt;
pub use preview::{generate_preview, generate_preview_with_ellipsis, PreviewConfig};
pub use render::{render_article, ArticleView};
pub use visibility::{can_view, should_mask, Viewer};

/// Code-point budget of the excerpt shown in article lists.
pub const LIST_EXCERPT_LENGTH: usize = 200;

/// Baseline access tier of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleVisibility {
    /// Only administrators can see the article.
    Hidden,
    /// Everyone sees the full content.
    PublicFull,
    /// Members and administrators see the full content, everyone else a
    /// preview.
    MemberFull,
    /// A stored value this build does not know; handled as admin-only and
    /// always masked.
    #[serde(other)]
    Unrecognized,
}

impl ArticleVisibility {
    /// Decodes a stored tier. Unknown values map to
    /// [`ArticleVisibility::Unrecognized`] instead of failing.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "hidden" => Self::Hidden,
            "public_full" => Self::PublicFull,
            "member_full" => Self::MemberFull,
            _ => Self::Unrecognized,
        }
    }

    /// Storage / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::PublicFull => "public_full",
            Self::MemberFull => "member_full",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Whether the tier may be written by an editor.
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

/// Publication state of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    /// Not yet published (or unpublished again).
    Draft,
    /// Publicly listed.
    Published,
}

impl ArticleStatus {
    /// Decodes the integer column; anything but `1` is a draft.
    pub fn from_db(value: i64) -> Self {
        if value == 1 {
            Self::Published
        } else {
            Self::Draft
        }
    }

    /// Integer column value.
    pub fn to_db(self) -> i64 {
        match self {
            Self::Draft => 0,
            Self::Published => 1,
        }
    }
}

// 完整文章数据模型
/// Full article record as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Primary key.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Unique URL slug.
    pub slug: String,
    /// Markdown body.
    pub content: String,
    /// Author user id.
    pub author_id: i64,
    /// Author email when the author row was joined.
    pub author_email: Option<String>,
    /// Access tier.
    pub visibility: ArticleVisibility,
    /// Share of the body shown in previews, 0–100.
    pub preview_percentage: i64,
    /// Lower bound on the preview length in code points.
    pub preview_min_chars: i64,
    /// Align preview cuts to paragraph/sentence boundaries.
    pub preview_smart_paragraph: bool,
    /// Publication state.
    pub status: ArticleStatus,
    /// First publication time, Unix milliseconds.
    pub published_at: Option<i64>,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}

impl Article {
    /// Published articles have the published status and a publication time.
    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published && self.published_at.is_some()
    }

    /// Preview settings stored on this article.
    pub fn preview_config(&self) -> PreviewConfig {
        PreviewConfig::new(
            self.preview_percentage,
            self.preview_min_chars,
            self.preview_smart_paragraph,
        )
    }
}

// 列表项（精简版）
/// Article summary used by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleListItem {
    /// Primary key.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Unique URL slug.
    pub slug: String,
    /// Plain-text excerpt of the body.
    pub excerpt: String,
    /// Author user id.
    pub author_id: i64,
    /// Author email, if known.
    pub author_email: Option<String>,
    /// Access tier.
    pub visibility: ArticleVisibility,
    /// Publication state.
    pub status: ArticleStatus,
    /// Unix milliseconds.
    pub published_at: Option<i64>,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl From<&Article> for ArticleListItem {
    fn from(a: &Article) -> Self {
        ArticleListItem {
            id: a.id,
            title: a.title.clone(),
            slug: a.slug.clone(),
            excerpt: generate_excerpt(&a.content, LIST_EXCERPT_LENGTH),
            author_id: a.author_id,
            author_email: a.author_email.clone(),
            visibility: a.visibility,
            status: a.status,
            published_at: a.published_at,
            created_at: a.created_at,
        }
    }
}

/// A comment row. Replies point at their parent through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Primary key.
    pub id: i64,
    /// Article the comment belongs to.
    pub article_id: i64,
    /// Author user id.
    pub user_id: i64,
    /// Author email, if the user row still exists.
    pub author_email: Option<String>,
    /// Parent comment for replies.
    pub parent_id: Option<i64>,
    /// Comment text, or the deletion placeholder.
    pub content: String,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}

/// A comment with its nested replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    /// The comment itself.
    #[serde(flatten)]
    pub comment: Comment,
    /// Direct replies, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<CommentNode>,
}

/// Site-wide presentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Site title.
    pub site_name: String,
    /// Meta description.
    pub site_description: String,
    /// Meta keywords, comma separated.
    pub site_keywords: String,
    /// Home page heading.
    pub home_title: String,
    /// Home page sub-heading.
    pub home_subtitle: String,
    /// Free-form home page block.
    pub home_custom_content: String,
    /// Footer line.
    pub footer_text: String,
    /// Logo image URL; empty for none.
    pub logo_url: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Quill".to_string(),
            site_description: "A role-based blog".to_string(),
            site_keywords: "blog, articles, technology".to_string(),
            home_title: "Welcome to Quill".to_string(),
            home_subtitle: "Articles, notes and member-only deep dives".to_string(),
            home_custom_content: String::new(),
            footer_text: "Quill. All rights reserved.".to_string(),
            logo_url: String::new(),
        }
    }
}
