//! `preview`: render a Markdown file for a chosen viewer without touching the
//! database.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use quill_shared::{generate_excerpt, render_article, ArticleView, LIST_EXCERPT_LENGTH};

use crate::{
    cli::ViewerRole,
    utils::{article_input, draft_article, parse_markdown},
};

/// What `preview` shows for one file and viewer.
#[derive(Debug)]
pub struct PreviewOutput {
    /// Article as the viewer receives it.
    pub view: ArticleView,
    /// List excerpt of the full body.
    pub excerpt: String,
    /// Code points in the full body.
    pub total_chars: usize,
}

/// Renders `file` as `role` would receive it.
pub fn render(file: &Path, role: ViewerRole) -> Result<PreviewOutput> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("failed to read markdown file {}", file.display()))?;
    let (frontmatter, body) = parse_markdown(&content)?;
    let article = draft_article(article_input(&frontmatter, body, file)?);

    let view = render_article(&article, role.viewer().as_ref()).with_context(|| {
        format!("{role:?} cannot see a {} article", article.visibility.as_str())
    })?;
    Ok(PreviewOutput {
        view,
        excerpt: generate_excerpt(&article.content, LIST_EXCERPT_LENGTH),
        total_chars: article.content.chars().count(),
    })
}

/// Prints the rendered article, as text or JSON.
pub fn run(file: &Path, role: ViewerRole, json: bool) -> Result<()> {
    let PreviewOutput {
        view,
        excerpt,
        total_chars,
    } = render(file, role)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("title:      {}", view.title);
    println!("slug:       {}", view.slug);
    println!("visibility: {}", view.visibility.as_str());
    println!("viewer:     {role:?}");
    println!("is_preview: {}", view.is_preview);
    println!("length:     {} / {} chars", view.content.chars().count(), total_chars);
    println!("excerpt:    {excerpt}");
    println!("---");
    println!("{}", view.content);
    Ok(())
}
