//! Plain-text excerpts for article lists.

use once_cell::sync::Lazy;
use regex::Regex;

/// How far before `max_length` the cut may move to land on a space.
const MAX_BACKWARD_SPACE_SEARCH: usize = 30;

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| compile(r"(?s)```[^`]*```"));
static IMAGE: Lazy<Regex> = Lazy::new(|| compile(r"!\[[^\]]*\]\([^)]+\)"));
static LINK: Lazy<Regex> = Lazy::new(|| compile(r"\[([^\]]+)\]\([^)]+\)"));
static HEADING: Lazy<Regex> = Lazy::new(|| compile(r"(?m)^#{1,6}\s*"));
static STAR_EMPHASIS: Lazy<Regex> = Lazy::new(|| compile(r"\*{1,2}([^*]+)\*{1,2}"));
static UNDERSCORE_EMPHASIS: Lazy<Regex> = Lazy::new(|| compile(r"_{1,2}([^_]+)_{1,2}"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| compile(r"`([^`]+)`"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| compile(r"\s+"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static excerpt pattern")
}

/// Removes common Markdown syntax, keeping the readable text.
///
/// Best effort only: the output feeds list summaries and is not a sanitizer.
pub fn strip_markdown(content: &str) -> String {
    // Code blocks and images go first so their bodies never reach the
    // emphasis and link patterns.
    let text = FENCED_CODE.replace_all(content, " ");
    let text = IMAGE.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = STAR_EMPHASIS.replace_all(&text, "$1");
    let text = UNDERSCORE_EMPHASIS.replace_all(&text, "$1");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Summarizes `content` in at most `max_length` code points plus `"..."`.
///
/// The cut moves back to the nearest space within 30 code points when one
/// exists.
pub fn generate_excerpt(content: &str, max_length: usize) -> String {
    let text = strip_markdown(content);

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text;
    }

    let floor = (max_length + 1)
        .saturating_sub(MAX_BACKWARD_SPACE_SEARCH)
        .max(1);
    let cut = (floor..=max_length)
        .rev()
        .find(|&i| chars[i] == ' ')
        .unwrap_or(max_length);

    let head: String = chars[..cut].iter().collect();
    format!("{}...", head.trim())
}
