//! The read loop driving one generation run.
//!
//! Chunks flow through the demultiplexer, record decoder and normalizer
//! into the accumulator, one at a time and in arrival order. The loop only
//! suspends while waiting for the next chunk.

use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::accumulator::PresentationAccumulator;
use crate::error::{Error, Result};
use crate::framing::FrameDemuxer;
use crate::normalize::SlideNormalizer;
use crate::record::{Decoded, RecordDecoder};
use crate::types::{PresentationStatus, Slide};

/// Progress notifications published while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The first chunk arrived.
    Started,
    /// A slide was appended.
    SlideAppended(Slide),
    /// A record could not be decoded and was skipped.
    RecordSkipped { reason: String },
    /// The stream ended normally.
    Completed { slides: usize },
    /// The transport failed; the presentation is marked failed.
    Failed { reason: String },
}

/// How a run that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Abandoned by the caller; the presentation keeps its slides and is not
    /// completed.
    Cancelled,
}

/// What a single record payload produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Appended(Slide),
    Skipped(String),
    NoOp,
}

/// Synchronous stages between raw chunks and the accumulator.
#[derive(Default)]
pub struct SlidePipeline {
    demuxer: FrameDemuxer,
    decoder: RecordDecoder,
    normalizer: SlideNormalizer,
}

impl SlidePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw chunk and return the record payloads it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.demuxer.push(chunk)
    }

    /// Decode and normalize one payload, appending the slide it carries.
    ///
    /// Decode failures are reported as [`Applied::Skipped`], never as errors.
    pub fn apply(&self, payload: &str, acc: &mut PresentationAccumulator) -> Result<Applied> {
        match self.decoder.decode(payload) {
            Ok(Decoded::Content(text)) => {
                let slide = self.normalizer.normalize(&text, acc.next_index());
                let slide = acc.append(slide)?.clone();
                Ok(Applied::Appended(slide))
            }
            Ok(Decoded::NoOp) => Ok(Applied::NoOp),
            Err(e) => {
                log::warn!("Skipping undecodable record: {}", e);
                Ok(Applied::Skipped(e.to_string()))
            }
        }
    }

    /// End of stream. An unterminated trailing record is dropped, not parsed.
    pub fn finish(&mut self) {
        if let Some(rest) = self.demuxer.finish() {
            log::debug!("Discarding {} unterminated trailing bytes", rest.len());
        }
    }
}

fn emit(events: Option<&UnboundedSender<StreamEvent>>, event: StreamEvent) {
    if let Some(tx) = events {
        // Observers may go away at any time.
        let _ = tx.send(event);
    }
}

/// Drive a chunk stream into `acc` until it ends, fails or is cancelled.
///
/// - End of stream finalizes the presentation as completed.
/// - A stream error finalizes it as failed and returns [`Error::Transport`].
/// - Cancellation drops the stream at once and leaves the status untouched.
pub async fn drive<S, B, E>(
    stream: S,
    acc: &mut PresentationAccumulator,
    cancel: &CancellationToken,
    events: Option<&UnboundedSender<StreamEvent>>,
) -> Result<RunOutcome>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut pipeline = SlidePipeline::new();
    let mut started = false;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!(
                    "Generation of {} cancelled after {} slides",
                    acc.snapshot().id,
                    acc.len()
                );
                return Ok(RunOutcome::Cancelled);
            }
            next = stream.next() => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                let reason = e.to_string();
                log::warn!("Stream failed after {} slides: {}", acc.len(), reason);
                acc.finalize(PresentationStatus::Failed)?;
                emit(
                    events,
                    StreamEvent::Failed {
                        reason: reason.clone(),
                    },
                );
                return Err(Error::Transport(reason));
            }
            None => break,
        };

        if !started {
            started = true;
            acc.mark_streaming()?;
            emit(events, StreamEvent::Started);
        }

        for payload in pipeline.feed(chunk.as_ref()) {
            if cancel.is_cancelled() {
                log::info!("Generation cancelled mid-chunk after {} slides", acc.len());
                return Ok(RunOutcome::Cancelled);
            }
            match pipeline.apply(&payload, acc)? {
                Applied::Appended(slide) => emit(events, StreamEvent::SlideAppended(slide)),
                Applied::Skipped(reason) => emit(events, StreamEvent::RecordSkipped { reason }),
                Applied::NoOp => {}
            }
        }
    }

    pipeline.finish();
    acc.finalize(PresentationStatus::Completed)?;
    emit(events, StreamEvent::Completed { slides: acc.len() });
    Ok(RunOutcome::Completed)
}
