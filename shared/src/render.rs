//! Assembles the article representation a given viewer receives.

use serde::{Deserialize, Serialize};

use crate::{
    error::BlogResult,
    preview::generate_preview,
    visibility::{can_view, should_mask, Viewer},
    Article, ArticleStatus, ArticleVisibility, BlogError,
};

/// Article as returned to a reader: full or masked body plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleView {
    /// Primary key.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Unique URL slug.
    pub slug: String,
    /// Full body, or the preview when `is_preview` is set.
    pub content: String,
    /// Author user id.
    pub author_id: i64,
    /// Author email, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    /// Access tier.
    pub visibility: ArticleVisibility,
    /// Stored preview percentage.
    pub preview_percentage: i64,
    /// Stored preview minimum length.
    pub preview_min_chars: i64,
    /// Stored smart-cut flag.
    pub preview_smart_paragraph: bool,
    /// Publication state.
    pub status: ArticleStatus,
    /// Unix milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<i64>,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
    /// Whether `content` was masked down to a preview.
    pub is_preview: bool,
}

/// Applies the visibility policy to `article` for `viewer`.
///
/// Articles the viewer may not see yield [`BlogError::NotFound`], the same
/// error a missing slug produces.
pub fn render_article(article: &Article, viewer: Option<&Viewer>) -> BlogResult<ArticleView> {
    if !can_view(article.visibility, viewer) {
        return Err(BlogError::NotFound);
    }

    let is_preview = should_mask(article.visibility, viewer);
    let content = if is_preview {
        generate_preview(&article.content, &article.preview_config())
    } else {
        article.content.clone()
    };

    Ok(ArticleView {
        id: article.id,
        title: article.title.clone(),
        slug: article.slug.clone(),
        content,
        author_id: article.author_id,
        author_email: article.author_email.clone(),
        visibility: article.visibility,
        preview_percentage: article.preview_percentage,
        preview_min_chars: article.preview_min_chars,
        preview_smart_paragraph: article.preview_smart_paragraph,
        status: article.status,
        published_at: article.published_at,
        created_at: article.created_at,
        updated_at: article.updated_at,
        is_preview,
    })
}

#[cfg(test)]
mod tests {
    use super::render_article;
    use crate::{Article, ArticleStatus, ArticleVisibility, BlogError, Viewer};

    fn article(visibility: ArticleVisibility) -> Article {
        Article {
            id: 7,
            title: "Ownership".to_string(),
            slug: "ownership".to_string(),
            content: "Borrowing rules first.\n\nThen lifetimes, in depth.".to_string(),
            author_id: 1,
            author_email: Some("admin@example.com".to_string()),
            visibility,
            preview_percentage: 10,
            preview_min_chars: 5,
            preview_smart_paragraph: true,
            status: ArticleStatus::Published,
            published_at: Some(1_700_000_000_000),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn hidden_article_is_not_found_for_non_admins() {
        let hidden = article(ArticleVisibility::Hidden);
        assert!(matches!(render_article(&hidden, None), Err(BlogError::NotFound)));
        assert!(matches!(
            render_article(&hidden, Some(&Viewer::MEMBER)),
            Err(BlogError::NotFound)
        ));

        let view = render_article(&hidden, Some(&Viewer::ADMIN)).expect("admin sees hidden");
        assert!(!view.is_preview);
        assert_eq!(view.content, hidden.content);
    }

    #[test]
    fn member_article_is_masked_for_guests() {
        let source = article(ArticleVisibility::MemberFull);
        let view = render_article(&source, None).expect("guest sees preview");
        assert!(view.is_preview);
        // 10% of 49 = 4 < 5; the smart cut snaps to the paragraph break
        assert_eq!(view.content, "Borrowing rules first.\n\n");
        assert_eq!(view.slug, "ownership");
        assert_eq!(view.preview_percentage, 10);
    }

    #[test]
    fn member_article_is_full_for_members() {
        let source = article(ArticleVisibility::MemberFull);
        let view = render_article(&source, Some(&Viewer::MEMBER)).expect("member sees full");
        assert!(!view.is_preview);
        assert_eq!(view.content, source.content);
    }

    #[test]
    fn public_article_is_never_masked() {
        let source = article(ArticleVisibility::PublicFull);
        let view = render_article(&source, None).expect("guest sees public");
        assert!(!view.is_preview);
        assert_eq!(view.content, source.content);
    }

    #[test]
    fn unrecognized_tier_masks_even_admins() {
        let source = article(ArticleVisibility::Unrecognized);
        assert!(matches!(render_article(&source, Some(&Viewer::USER)), Err(BlogError::NotFound)));
        let view = render_article(&source, Some(&Viewer::ADMIN)).expect("admin sees it");
        assert!(view.is_preview);
    }
}
