//! Record framing over an arbitrarily chunked byte stream.
//!
//! Chunks are decoded to text with a stateful UTF-8 decoder (a character
//! may straddle two chunks) and appended to a single buffer. Complete
//! records are cut at every boundary marker; the unterminated remainder
//! waits for the next chunk.

use memchr::memmem::Finder;

/// Separator between two records on the wire.
pub const RECORD_BOUNDARY: &str = "\n\n";

/// Compact the buffer once this many consumed bytes sit at its front.
const COMPACT_THRESHOLD: usize = 4096;

/// Incremental UTF-8 decoder.
///
/// Holds back the bytes of a character that is cut off at the end of a
/// chunk until the rest of it arrives. Invalid sequences decode to
/// U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, appending the text to `out`.
    pub fn decode_into(&mut self, chunk: &[u8], out: &mut String) {
        if self.pending.is_empty() {
            self.decode_bytes(chunk, out);
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            self.decode_bytes(&joined, out);
        }
    }

    fn decode_bytes(&mut self, mut bytes: &[u8], out: &mut String) {
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = bytes.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            bytes = &rest[len..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Whether an incomplete character is waiting for more bytes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Flush at end of stream. A dangling partial character becomes U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
}

/// Splits a chunked text stream into record payloads.
///
/// The buffer is an arena with two cursors: `start` marks the first byte
/// not yet emitted, `scan_from` the first byte not yet searched for the
/// boundary. Each byte is therefore searched once no matter how many small
/// chunks arrive before a boundary shows up.
pub struct FrameDemuxer {
    decoder: Utf8StreamDecoder,
    buffer: String,
    start: usize,
    scan_from: usize,
    finder: Finder<'static>,
    boundary_len: usize,
}

impl Default for FrameDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDemuxer {
    /// Create a demultiplexer that splits on [`RECORD_BOUNDARY`].
    pub fn new() -> Self {
        Self::with_boundary(RECORD_BOUNDARY)
    }

    /// Create a demultiplexer with a custom boundary marker.
    pub fn with_boundary(boundary: &str) -> Self {
        Self {
            decoder: Utf8StreamDecoder::new(),
            buffer: String::new(),
            start: 0,
            scan_from: 0,
            finder: Finder::new(boundary.as_bytes()).into_owned(),
            boundary_len: boundary.len(),
        }
    }

    /// Feed one raw chunk and return every record it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decoder.decode_into(chunk, &mut self.buffer);

        let mut records = Vec::new();
        while let Some(offset) = self.finder.find(&self.buffer.as_bytes()[self.scan_from..]) {
            let end = self.scan_from + offset;
            records.push(self.buffer[self.start..end].to_string());
            self.start = end + self.boundary_len;
            self.scan_from = self.start;
        }

        // A boundary may begin in the tail we just searched; rescan only that.
        let tail = self.boundary_len.saturating_sub(1);
        self.scan_from = self.buffer.len().saturating_sub(tail).max(self.start);

        self.compact();
        records
    }

    /// Drop the emitted prefix once it grows large.
    fn compact(&mut self) {
        if self.start == self.buffer.len() {
            self.buffer.clear();
            self.start = 0;
            self.scan_from = 0;
        } else if self.start >= COMPACT_THRESHOLD && self.start * 2 >= self.buffer.len() {
            self.buffer.drain(..self.start);
            self.scan_from -= self.start;
            self.start = 0;
        }
    }

    /// Bytes received but not yet emitted as part of a record.
    pub fn pending(&self) -> &str {
        &self.buffer[self.start..]
    }

    /// End the stream and return the unterminated remainder, if any.
    ///
    /// The remainder is never a record: callers discard it.
    pub fn finish(&mut self) -> Option<String> {
        self.decoder.finish(&mut self.buffer);
        let rest = self.buffer[self.start..].to_string();
        self.buffer.clear();
        self.start = 0;
        self.scan_from = 0;
        (!rest.is_empty()).then_some(rest)
    }
}
