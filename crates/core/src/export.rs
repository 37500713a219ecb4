//! Stored text format for finished presentations.
//!
//! Slides are written as `Slide {n}: {title}\n\n{content}` blocks joined by
//! [`STORED_SEPARATOR`]. Parsing inverts this exactly; blocks that do not
//! carry the `Slide {n}: ` header (raw generator text) go through the
//! normalizer instead.

use regex::Regex;
use std::sync::LazyLock;

use crate::normalize::SlideNormalizer;
use crate::record::SLIDE_SEPARATOR;
use crate::types::{Presentation, Slide, StoredPresentation};

/// Sequence joining slide blocks in stored content.
pub const STORED_SEPARATOR: &str = "\n\n---SLIDE_SEPARATOR---\n\n";

/// Separates a block's header line from its content.
const HEADER_BREAK: &str = "\n\n";

/// Regex to match an exported block header.
static HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Slide (\d+): (.+)$").unwrap());

/// Formatter and parser for the stored text format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExporter {
    normalizer: SlideNormalizer,
}

impl TextExporter {
    /// Create a new exporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one slide as a stored block.
    pub fn format_slide(&self, slide: &Slide) -> String {
        format!(
            "Slide {}: {}{}{}",
            slide.number(),
            slide.title,
            HEADER_BREAK,
            slide.content
        )
    }

    /// Render slides in order as stored content.
    ///
    /// Only the slides given are written, so an in-flight presentation
    /// exports whatever has been accumulated so far.
    pub fn format(&self, slides: &[Slide]) -> String {
        slides
            .iter()
            .map(|slide| self.format_slide(slide))
            .collect::<Vec<_>>()
            .join(STORED_SEPARATOR)
    }

    /// Rebuild slides from stored content.
    pub fn parse(&self, content: &str) -> Vec<Slide> {
        let mut slides = Vec::new();

        for block in content.split(STORED_SEPARATOR) {
            let trimmed = block.trim();
            if trimmed.is_empty() || trimmed == SLIDE_SEPARATOR {
                continue;
            }

            let index = slides.len();
            let slide = match self.parse_exported_block(block, index) {
                Some(slide) => slide,
                None => self.normalizer.normalize(block, index),
            };
            slides.push(slide);
        }

        slides
    }

    /// Parse a block written by [`Self::format_slide`].
    fn parse_exported_block(&self, block: &str, index: usize) -> Option<Slide> {
        let (header, content) = block.split_once(HEADER_BREAK)?;
        let caps = HEADER_REGEX.captures(header)?;

        let number = caps.get(1)?.as_str();
        if number.parse::<usize>().ok() != Some(index + 1) {
            log::warn!(
                "Stored block numbered {} found at position {}",
                number,
                index + 1
            );
        }

        let title = caps.get(2)?.as_str();
        Some(Slide::new(index, title, content))
    }

    /// Persistable form of a presentation.
    pub fn to_stored(&self, presentation: &Presentation) -> StoredPresentation {
        StoredPresentation {
            id: presentation.id.clone(),
            title: presentation.title.clone(),
            status: presentation.status,
            output_file_path: None,
            created_at: Some(presentation.created_at),
            content: Some(self.format(&presentation.slides)),
        }
    }

    /// Re-hydrate a persisted presentation.
    ///
    /// A missing timestamp falls back to the Unix epoch.
    pub fn from_stored(&self, stored: StoredPresentation) -> Presentation {
        let slides = stored
            .content
            .as_deref()
            .map(|content| self.parse(content))
            .unwrap_or_default();

        Presentation {
            id: stored.id,
            title: stored.title,
            status: stored.status,
            slides,
            created_at: stored.created_at.unwrap_or_default(),
        }
    }
}
