//! Preview generation for masked articles.
//!
//! All lengths are counted in Unicode code points, never bytes, so a cut can
//! not split a multi-byte character.

use serde::{Deserialize, Serialize};

const DEFAULT_PERCENTAGE: u8 = 30;
const DEFAULT_MIN_CHARS: usize = 200;

/// How far past the target the smart cut may look for a break.
const MAX_FORWARD_SEARCH: usize = 100;
/// How far before the target the smart cut may look for a sentence end.
const MAX_BACKWARD_SENTENCE_SEARCH: usize = 50;
/// How far before the target the smart cut may look for a word break.
const MAX_BACKWARD_SPACE_SEARCH: usize = 30;

const ELLIPSIS: &str = "...";

/// Preview policy for a single render. Built fresh from the article's stored
/// fields on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewConfig {
    percentage: u8,
    min_chars: usize,
    smart_paragraph: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            percentage: DEFAULT_PERCENTAGE,
            min_chars: DEFAULT_MIN_CHARS,
            smart_paragraph: true,
        }
    }
}

impl PreviewConfig {
    /// Builds a config from stored values, clamping `percentage` into
    /// `0..=100` and `min_chars` to be non-negative.
    pub fn new(percentage: i64, min_chars: i64, smart_paragraph: bool) -> Self {
        Self {
            percentage: percentage.clamp(0, 100) as u8,
            min_chars: usize::try_from(min_chars.max(0)).unwrap_or(usize::MAX),
            smart_paragraph,
        }
    }

    /// Share of the content to expose, 0–100.
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    /// Floor on the exposed length.
    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Whether the cut snaps to a natural text boundary.
    pub fn smart_paragraph(&self) -> bool {
        self.smart_paragraph
    }

    /// `max(min_chars, floor(total * percentage / 100))`.
    fn target_length(&self, total: usize) -> usize {
        let by_percentage = total.saturating_mul(self.percentage as usize) / 100;
        by_percentage.max(self.min_chars)
    }
}

/// Truncates `content` according to `config`.
///
/// Returns the content unchanged when the target length reaches the full
/// length. The result never has more code points than the input.
pub fn generate_preview(content: &str, config: &PreviewConfig) -> String {
    if content.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = content.chars().collect();
    let total = chars.len();
    let target = config.target_length(total);
    if target >= total {
        return content.to_string();
    }

    let cut = if config.smart_paragraph {
        find_smart_cut_point(&chars, target).min(total)
    } else {
        target
    };

    let byte_end = content
        .char_indices()
        .nth(cut)
        .map_or(content.len(), |(offset, _)| offset);
    content[..byte_end].to_string()
}

/// Like [`generate_preview`], but appends `"..."` (after trimming trailing
/// whitespace) when the content was shortened. The flag reports whether that
/// happened.
pub fn generate_preview_with_ellipsis(content: &str, config: &PreviewConfig) -> (String, bool) {
    let mut preview = generate_preview(content, config);
    let truncated = preview.chars().count() < content.chars().count();

    if truncated {
        let kept = preview.trim_end_matches([' ', '\t', '\n', '\r']).len();
        preview.truncate(kept);
        preview.push_str(ELLIPSIS);
    }

    (preview, truncated)
}

/// Picks a cut index near `target`: paragraph break, line break, then
/// sentence end looking forward; sentence end, then word break looking
/// backward; otherwise `target` itself.
fn find_smart_cut_point(chars: &[char], target: usize) -> usize {
    let end = (target + MAX_FORWARD_SEARCH).min(chars.len());

    // The second newline of a pair may sit on the last window index.
    let paragraph_break = (target..end.saturating_sub(1))
        .find(|&i| chars[i] == '\n' && chars[i + 1] == '\n');
    if let Some(i) = paragraph_break {
        return i + 2;
    }

    if let Some(i) = (target..end).find(|&i| chars[i] == '\n') {
        return i + 1;
    }

    if let Some(i) = (target..end).find(|&i| is_sentence_end(chars[i])) {
        return i + 1;
    }

    let sentence_floor = backward_floor(target, MAX_BACKWARD_SENTENCE_SEARCH);
    if let Some(i) = (sentence_floor..=target)
        .rev()
        .find(|&i| is_sentence_end(chars[i]))
    {
        return i + 1;
    }

    let space_floor = backward_floor(target, MAX_BACKWARD_SPACE_SEARCH);
    if let Some(i) = (space_floor..=target)
        .rev()
        .find(|&i| matches!(chars[i], ' ' | '\t'))
    {
        return i;
    }

    target
}

/// Lowest index a backward scan of `span` positions from `target` visits.
/// Index 0 is never inspected; the range is empty when `target` is 0.
fn backward_floor(target: usize, span: usize) -> usize {
    (target + 1).saturating_sub(span).max(1)
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '；')
}

#[cfg(test)]
mod tests {
    use super::{generate_preview, generate_preview_with_ellipsis, PreviewConfig};

    fn exact(percentage: i64, min_chars: i64) -> PreviewConfig {
        PreviewConfig::new(percentage, min_chars, false)
    }

    fn smart(percentage: i64, min_chars: i64) -> PreviewConfig {
        PreviewConfig::new(percentage, min_chars, true)
    }

    #[test]
    fn percentage_uses_integer_floor() {
        assert_eq!(generate_preview("0123456789", &exact(30, 0)), "012");
        assert_eq!(generate_preview("0123456789", &exact(33, 0)), "012");
    }

    #[test]
    fn min_chars_overrides_small_percentage() {
        assert_eq!(generate_preview("0123456789", &exact(10, 5)), "01234");
    }

    #[test]
    fn returns_input_when_target_covers_everything() {
        assert_eq!(generate_preview("short", &smart(100, 0)), "short");
        assert_eq!(generate_preview("short", &exact(0, 5)), "short");
        assert_eq!(generate_preview("short", &PreviewConfig::default()), "short");
    }

    #[test]
    fn empty_content_stays_empty() {
        assert_eq!(generate_preview("", &smart(50, 0)), "");
        assert_eq!(generate_preview_with_ellipsis("", &smart(50, 0)), (String::new(), false));
    }

    #[test]
    fn cuts_cjk_by_code_point() {
        assert_eq!(generate_preview("你好世界", &exact(50, 0)), "你好");
    }

    #[test]
    fn smart_cut_prefers_paragraph_break() {
        // target = 3, inside "AAAAA"
        assert_eq!(generate_preview("AAAAA\n\nBBBBB", &smart(25, 0)), "AAAAA\n\n");
    }

    #[test]
    fn smart_cut_prefers_paragraph_over_earlier_line_break() {
        let content = "AAA\nAAA\n\nBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
        assert_eq!(generate_preview(content, &smart(0, 2)), "AAA\nAAA\n\n");
    }

    #[test]
    fn smart_cut_falls_back_to_line_break() {
        let content = "first line goes here\nsecond line";
        assert_eq!(generate_preview(content, &smart(0, 5)), "first line goes here\n");
    }

    #[test]
    fn smart_cut_uses_forward_sentence_end() {
        let content = "One sentence here. Another one follows";
        assert_eq!(generate_preview(content, &smart(0, 4)), "One sentence here.");
    }

    #[test]
    fn smart_cut_accepts_cjk_punctuation() {
        let content = "这是第一句话；这是第二句话，后面还有很多很多内容";
        assert_eq!(generate_preview(content, &smart(0, 2)), "这是第一句话；");
    }

    #[test]
    fn smart_cut_scans_backward_for_sentence_end() {
        // No break within 100 chars after the target.
        let content = format!("Intro. {}", "x".repeat(200));
        assert_eq!(generate_preview(&content, &smart(0, 20)), "Intro.");
    }

    #[test]
    fn smart_cut_scans_backward_for_space() {
        let content = format!("alpha beta{}", "x".repeat(200));
        assert_eq!(generate_preview(&content, &smart(0, 12)), "alpha");
    }

    fn marker_at(index: usize, marker: char) -> String {
        format!("{}{marker}{}", "a".repeat(index), "b".repeat(300))
    }

    fn head(content: &str, n: usize) -> String {
        content.chars().take(n).collect()
    }

    #[test]
    fn backward_sentence_scan_reaches_49_back() {
        // target = 60
        let content = marker_at(11, '.');
        assert_eq!(generate_preview(&content, &smart(0, 60)), head(&content, 12));

        let content = marker_at(10, '.');
        assert_eq!(generate_preview(&content, &smart(0, 60)), head(&content, 60));
    }

    #[test]
    fn backward_space_scan_reaches_29_back() {
        // target = 60
        let content = marker_at(31, ' ');
        assert_eq!(generate_preview(&content, &smart(0, 60)), "a".repeat(31));

        let content = marker_at(30, ' ');
        assert_eq!(generate_preview(&content, &smart(0, 60)), head(&content, 60));
    }

    #[test]
    fn smart_cut_falls_back_to_exact_target() {
        let content = "y".repeat(300);
        assert_eq!(generate_preview(&content, &smart(0, 40)), "y".repeat(40));
    }

    #[test]
    fn forward_window_is_bounded() {
        // The paragraph break sits 150 chars past the target, out of reach.
        let content = format!("{}\n\n{}", "z".repeat(160), "w".repeat(40));
        assert_eq!(generate_preview(&content, &smart(0, 10)), "z".repeat(10));
    }

    #[test]
    fn preview_never_grows() {
        let samples = [
            "plain ascii text without breaks at all, just words and words",
            "Para one.\n\nPara two!\nLine three? 结尾。",
            "混合 mixed 文本。With punctuation! 还有；更多",
            "\n\n\n\n\n\n\n\n",
            "....................",
        ];
        for content in samples {
            let total = content.chars().count();
            for percentage in [0, 1, 25, 50, 99, 100] {
                for min_chars in [0, 1, 3, 10, 500] {
                    for smart_paragraph in [false, true] {
                        let config = PreviewConfig::new(percentage, min_chars, smart_paragraph);
                        let preview = generate_preview(content, &config);
                        assert!(preview.chars().count() <= total, "{config:?} grew {content:?}");
                        assert!(content.starts_with(&preview));
                    }
                }
            }
        }
    }

    #[test]
    fn negative_values_are_clamped() {
        let config = PreviewConfig::new(-20, -5, false);
        assert_eq!(config.percentage(), 0);
        assert_eq!(config.min_chars(), 0);
        assert_eq!(generate_preview("abc", &config), "");
        assert_eq!(PreviewConfig::new(250, 0, false).percentage(), 100);
    }

    #[test]
    fn ellipsis_is_appended_after_trimming() {
        let (preview, truncated) =
            generate_preview_with_ellipsis("AAAAA\n\nBBBBB", &smart(25, 0));
        assert!(truncated);
        assert_eq!(preview, "AAAAA...");

        let (preview, truncated) = generate_preview_with_ellipsis("short", &smart(100, 0));
        assert!(!truncated);
        assert_eq!(preview, "short");
    }
}
