//! Core of streamed presentation generation: record framing over chunked
//! bytes, slide normalization, ordered accumulation, and the stored text
//! format used for export and re-hydration.

pub mod accumulator;
pub mod error;
pub mod export;
pub mod framing;
pub mod generate;
pub mod normalize;
pub mod record;
pub mod repository;
pub mod types;

pub use accumulator::PresentationAccumulator;
pub use error::{Error, Result};
pub use export::{TextExporter, STORED_SEPARATOR};
pub use framing::{FrameDemuxer, Utf8StreamDecoder, RECORD_BOUNDARY};
pub use generate::{drive, RunOutcome, SlidePipeline, StreamEvent};
pub use normalize::SlideNormalizer;
pub use record::{Decoded, Record, RecordDecoder, SLIDE_SEPARATOR};
pub use repository::{DirectoryRepository, MemoryRepository, PresentationRepository};
pub use types::{
    GenerationConfig, Presentation, PresentationStatus, PresentationSummary, Scope, Slide,
    StoredPresentation,
};
