//! Domain types for streamed presentations.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Smallest slide count the generator accepts.
pub const MIN_SLIDES: u32 = 5;

/// Largest slide count the generator accepts.
pub const MAX_SLIDES: u32 = 30;

/// Parse an RFC 3339 timestamp, or an offset-less ISO 8601 one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Services emit naive `isoformat()` timestamps next to RFC 3339 ones.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|raw| {
        parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp {:?}", raw)))
    })
    .transpose()
}

/// A single normalized, renderable slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// 0-based ordinal, assigned in arrival order.
    pub index: usize,

    /// Never empty; defaults to `Slide {index + 1}`.
    pub title: String,

    /// Body lines joined with `\n`, bullets canonicalized to `• `.
    pub content: String,
}

impl Slide {
    /// Create a new slide.
    pub fn new(index: usize, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            content: content.into(),
        }
    }

    /// 1-based slide number as shown to readers.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Fallback title for a slide at `index`.
    pub fn default_title(index: usize) -> String {
        format!("Slide {}", index + 1)
    }
}

impl fmt::Display for Slide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.number(), self.title)?;
        if !self.content.is_empty() {
            write!(f, "\n{}", self.content)?;
        }
        Ok(())
    }
}

/// Lifecycle status of one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationStatus {
    Pending,
    Streaming,
    Completed,
    Failed,
}

impl PresentationStatus {
    /// Terminal statuses accept no further appends.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PresentationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A presentation with its ordered slides and lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    /// Identifier, either assigned locally or by the generation service.
    pub id: String,

    /// Requested presentation title.
    pub title: String,

    /// Current lifecycle status.
    pub status: PresentationStatus,

    /// Slides in arrival order.
    pub slides: Vec<Slide>,

    /// When generation started.
    pub created_at: DateTime<Utc>,
}

impl Presentation {
    /// Create a pending presentation with a fresh random id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), title)
    }

    /// Create a pending presentation with a known id.
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: PresentationStatus::Pending,
            slides: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// A presentation without its slides, as returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationSummary {
    pub id: String,
    pub title: String,
    pub status: PresentationStatus,
    #[serde(default)]
    pub output_file_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A persisted presentation whose slides are kept in the joined text format.
///
/// This is the shape both the generation service and the local history
/// directory store; turning it back into slides always goes through
/// [`crate::export::TextExporter::from_stored`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPresentation {
    pub id: String,
    pub title: String,
    pub status: PresentationStatus,
    #[serde(default)]
    pub output_file_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Which part of the source material the generator should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    #[default]
    #[serde(rename = "Entire Document")]
    EntireDocument,
    #[serde(rename = "Specific Topic")]
    SpecificTopic,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntireDocument => "Entire Document",
            Self::SpecificTopic => "Specific Topic",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options sent with a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub title: String,
    pub scope: Scope,
    #[serde(default)]
    pub topic: Option<String>,
    pub detail_level: String,
    pub difficulty: String,
    pub slide_style: String,
    pub num_slides: u32,
    pub include_diagrams: bool,
    pub include_code_examples: bool,
}

impl GenerationConfig {
    /// Config with default options for the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            scope: Scope::EntireDocument,
            topic: None,
            detail_level: "detailed".to_string(),
            difficulty: "intermediate".to_string(),
            slide_style: "professional".to_string(),
            num_slides: 10,
            include_diagrams: false,
            include_code_examples: false,
        }
    }

    /// Restrict generation to one topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.scope = Scope::SpecificTopic;
        self.topic = Some(topic.into());
        self
    }

    pub fn with_num_slides(mut self, num_slides: u32) -> Self {
        self.num_slides = num_slides;
        self
    }

    /// Check the options before a request is sent.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidConfig("title must not be empty".to_string()));
        }

        let has_topic = self
            .topic
            .as_deref()
            .is_some_and(|topic| !topic.trim().is_empty());
        match self.scope {
            Scope::SpecificTopic if !has_topic => {
                return Err(Error::InvalidConfig(
                    "topic is required when scope is \"Specific Topic\"".to_string(),
                ));
            }
            Scope::EntireDocument if has_topic => {
                return Err(Error::InvalidConfig(
                    "topic is only allowed when scope is \"Specific Topic\"".to_string(),
                ));
            }
            _ => {}
        }

        if !(MIN_SLIDES..=MAX_SLIDES).contains(&self.num_slides) {
            return Err(Error::InvalidConfig(format!(
                "num_slides must be between {} and {}, got {}",
                MIN_SLIDES, MAX_SLIDES, self.num_slides
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_title() {
        assert_eq!(Slide::default_title(0), "Slide 1");
        assert_eq!(Slide::default_title(4), "Slide 5");
    }

    #[test]
    fn test_status_terminal() {
        assert!(!PresentationStatus::Pending.is_terminal());
        assert!(!PresentationStatus::Streaming.is_terminal());
        assert!(PresentationStatus::Completed.is_terminal());
        assert!(PresentationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&PresentationStatus::Streaming).unwrap();
        assert_eq!(json, "\"streaming\"");
    }

    #[test]
    fn test_config_wire_format() {
        let config = GenerationConfig::new("Calculus").with_topic("Derivatives");
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value["scope"], "Specific Topic");
        assert_eq!(value["topic"], "Derivatives");
        assert_eq!(value["num_slides"], 10);
        assert_eq!(value["include_code_examples"], false);
    }

    #[test]
    fn test_config_validation() {
        assert!(GenerationConfig::new("Calculus").validate().is_ok());
        assert!(GenerationConfig::new("  ").validate().is_err());

        let mut missing_topic = GenerationConfig::new("Calculus");
        missing_topic.scope = Scope::SpecificTopic;
        assert!(missing_topic.validate().is_err());

        let mut stray_topic = GenerationConfig::new("Calculus");
        stray_topic.topic = Some("Limits".to_string());
        assert!(stray_topic.validate().is_err());

        assert!(GenerationConfig::new("Calculus")
            .with_num_slides(4)
            .validate()
            .is_err());
        assert!(GenerationConfig::new("Calculus")
            .with_num_slides(31)
            .validate()
            .is_err());
        assert!(GenerationConfig::new("Calculus")
            .with_num_slides(30)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let with_offset = parse_timestamp("2024-03-01T10:15:00+02:00").unwrap();
        assert_eq!(with_offset.to_rfc3339(), "2024-03-01T08:15:00+00:00");

        let naive = parse_timestamp("2024-03-01T10:15:00.250000").unwrap();
        assert_eq!(naive.timestamp_millis() % 1000, 250);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_summary_accepts_naive_timestamp() {
        let summary: PresentationSummary = serde_json::from_str(
            r#"{"id": "7", "title": "Loans", "status": "completed", "created_at": "2024-03-01T10:15:00"}"#,
        )
        .unwrap();
        assert_eq!(summary.status, PresentationStatus::Completed);
        assert!(summary.created_at.is_some());
        assert_eq!(summary.output_file_path, None);

        let missing: PresentationSummary =
            serde_json::from_str(r#"{"id": "8", "title": "Cards", "status": "pending", "created_at": null}"#)
                .unwrap();
        assert_eq!(missing.created_at, None);
    }

    #[test]
    fn test_slide_display() {
        let slide = Slide::new(0, "Intro", "• One");
        assert_eq!(slide.to_string(), "[1] Intro\n• One");

        let empty = Slide::new(2, "Slide 3", "");
        assert_eq!(empty.to_string(), "[3] Slide 3");
    }
}
