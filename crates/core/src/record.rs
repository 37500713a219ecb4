//! Decoding of framed record payloads.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Literal token separating slides in stored content.
///
/// A record whose trimmed content is exactly this token carries no slide.
pub const SLIDE_SEPARATOR: &str = "---SLIDE_SEPARATOR---";

/// One structured record as sent by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Record {
    /// Producer-side slide number. Advisory only; ordinals are assigned locally.
    #[serde(default)]
    pub index: Option<i64>,

    /// Raw slide text.
    pub content: String,
}

/// What a payload turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Slide text to normalize.
    Content(String),
    /// Separator-only or empty payload; filtered without error.
    NoOp,
}

/// Decoder for record payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordDecoder;

impl RecordDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one payload.
    ///
    /// A payload that is not a JSON object with a string `content` field is a
    /// [`Error::Decode`]; the caller skips it and keeps reading.
    pub fn decode(&self, payload: &str) -> Result<Decoded> {
        if payload.trim().is_empty() {
            return Ok(Decoded::NoOp);
        }

        let record: Record =
            serde_json::from_str(payload).map_err(|e| Error::Decode(e.to_string()))?;

        if record.content.trim() == SLIDE_SEPARATOR {
            log::debug!("Filtered separator-only record");
            return Ok(Decoded::NoOp);
        }

        if let Some(index) = record.index {
            log::trace!("Decoded record with producer index {}", index);
        }

        Ok(Decoded::Content(record.content))
    }
}
