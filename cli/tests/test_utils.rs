//! Integration tests for CLI utilities.

#[cfg(test)]
mod tests {
    use std::{io::Write, path::Path};

    use quill_cli::utils;
    use quill_shared::ArticleVisibility;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_markdown_reads_frontmatter_and_content() {
        let mut file = NamedTempFile::new().expect("create temp file");
        let markdown = r#"---
title: "Ownership in Practice"
slug: "ownership-in-practice"
visibility: member_full
preview_percentage: 25
preview_min_chars: 120
preview_smart_paragraph: false
publish: true
---

# Heading

Body content.
"#;
        file.write_all(markdown.as_bytes()).expect("write markdown");
        file.flush().expect("flush markdown");

        let content = std::fs::read_to_string(file.path()).expect("read markdown");
        let (frontmatter, body) = utils::parse_markdown(&content).expect("parse markdown");

        assert_eq!(frontmatter.title.as_deref(), Some("Ownership in Practice"));
        assert_eq!(frontmatter.slug.as_deref(), Some("ownership-in-practice"));
        assert_eq!(frontmatter.visibility.as_deref(), Some("member_full"));
        assert_eq!(frontmatter.preview_percentage, Some(25));
        assert_eq!(frontmatter.preview_min_chars, Some(120));
        assert_eq!(frontmatter.preview_smart_paragraph, Some(false));
        assert_eq!(frontmatter.publish, Some(true));
        assert!(body.contains("# Heading"));
        assert!(body.contains("Body content."));
        assert!(!body.contains("preview_percentage"));
    }

    #[test]
    fn missing_frontmatter_uses_file_stem_and_defaults() {
        let (frontmatter, body) =
            utils::parse_markdown("Just a body.\n").expect("parse markdown");
        let input = utils::article_input(&frontmatter, body, Path::new("notes/first-post.md"))
            .expect("article input");

        assert_eq!(input.title, "first-post");
        assert_eq!(input.slug, "first-post");
        assert_eq!(input.visibility, ArticleVisibility::MemberFull);
        assert_eq!(input.preview_percentage, 30);
        assert_eq!(input.preview_min_chars, 200);
        assert!(input.preview_smart_paragraph);
        assert!(input.content.contains("Just a body."));
    }

    #[test]
    fn unknown_visibility_is_rejected() {
        let (frontmatter, body) =
            utils::parse_markdown("---\nvisibility: premium\n---\nBody\n").expect("parse");
        let err = utils::article_input(&frontmatter, body, Path::new("x.md"))
            .expect_err("premium is not a tier");
        assert!(err.to_string().contains("premium"));
    }

    #[test]
    fn draft_article_normalizes_slug_and_is_published() {
        let (frontmatter, body) =
            utils::parse_markdown("---\nslug: Hello World\n---\nBody\n").expect("parse");
        let input =
            utils::article_input(&frontmatter, body, Path::new("x.md")).expect("article input");
        let article = utils::draft_article(input);
        assert_eq!(article.slug, "hello-world");
        assert!(article.is_published());
    }
}
