//! Slide text normalization.
//!
//! Turns the raw multi-line text of one generated record into a [`Slide`]:
//! the first non-blank line becomes the title (emphasis markers and a
//! `Title:` label removed), the following lines become the body with every
//! bullet glyph rewritten to a canonical `• ` prefix.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::Slide;

/// Canonical bullet prefix used in slide bodies.
pub const BULLET: &str = "• ";

/// Markdown bold markers the generator wraps titles in.
const EMPHASIS: &str = "**";

/// Regex to match a leading `Slide Title:` or `Title:` label.
static TITLE_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:slide\s+title|title)\s*:\s*").unwrap());

/// Regex to match a leading bullet glyph, keeping indentation.
///
/// `*` and `-` only count when followed by whitespace so that `**Bold**`
/// or `-5` survive untouched.
static BULLET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(?:[*\-]\s+|•\s*)").unwrap());

/// Strip surrounding whitespace and `**` markers.
fn strip_emphasis(text: &str) -> &str {
    text.trim()
        .trim_start_matches(EMPHASIS)
        .trim_end_matches(EMPHASIS)
        .trim()
}

/// Derive a title from its source line.
///
/// Returns an empty string when nothing is left after cleanup.
fn clean_title(line: &str) -> String {
    let stripped = strip_emphasis(line);
    let unlabeled = TITLE_LABEL_REGEX.replace(stripped, "");
    // "**Title:** Foo" leaves a second pair of markers behind the label.
    strip_emphasis(&unlabeled).to_string()
}

/// Rewrite a leading bullet glyph to the canonical prefix.
fn canonicalize_bullet(line: &str) -> String {
    match BULLET_REGEX.captures(line) {
        Some(caps) => {
            let matched = caps.get(0).map_or(0, |m| m.end());
            let indent = caps.get(1).map_or("", |m| m.as_str());
            format!("{}{}{}", indent, BULLET, &line[matched..])
        }
        None => line.to_string(),
    }
}

/// Normalizer for generated slide text.
///
/// Stateless and deterministic: the same text and index always produce the
/// same slide.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlideNormalizer;

impl SlideNormalizer {
    /// Create a new slide normalizer.
    pub fn new() -> Self {
        Self
    }

    /// Normalize raw record text into the slide at `index`.
    pub fn normalize(&self, raw: &str, index: usize) -> Slide {
        let lines: Vec<&str> = raw.lines().collect();

        let title_line = lines.iter().position(|line| !line.trim().is_empty());

        let (title, content) = match title_line {
            Some(pos) => {
                let title = clean_title(lines[pos]);
                let content = lines[pos + 1..]
                    .iter()
                    .map(|line| canonicalize_bullet(line))
                    .collect::<Vec<_>>()
                    .join("\n");
                (title, content)
            }
            None => (String::new(), String::new()),
        };

        let title = if title.is_empty() {
            Slide::default_title(index)
        } else {
            title
        };

        Slide::new(index, title, content)
    }
}
