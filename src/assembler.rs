//! Assembles a chat reply from a Server-Sent-Events byte stream.
//!
//! The completion endpoint frames its reply as `\n`-terminated records:
//!
//! ```text
//! : keep-alive
//! data: {"choices":[{"delta":{"content":"Na"}}]}
//!
//! data: [DONE]
//! ```
//!
//! [`StreamAssembler`] turns arbitrary chunks of that stream into snapshots
//! of the full reply text so far. Chunks may split a record mid-line or a
//! character mid-sequence.

use crate::models::StreamChunk;
use crate::utf8::Utf8StreamDecoder;
use serde_json::Value;
use tracing::{debug, trace, warn};

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";
/// Deferred text beyond this size is logged once as a stalled stream.
const DEFERRED_WARN_BYTES: usize = 64 * 1024;

/// What one record line means to the assembler.
#[derive(Debug, PartialEq, Eq)]
enum Record<'a> {
    /// Blank, comment or non-data line
    Skip,
    Done,
    Payload(&'a str),
}

/// Parse one data payload.
///
/// `Err` means the text is not JSON at all, which may be a line cut short.
/// JSON of another shape carries no fragment and yields `Ok(None)`.
fn parse_payload(payload: &str) -> Result<Option<StreamChunk>, serde_json::Error> {
    let value: Value = serde_json::from_str(payload)?;
    match serde_json::from_value::<StreamChunk>(value) {
        Ok(chunk) => Ok(Some(chunk)),
        Err(e) => {
            debug!(error = %e, "data payload has no delta content");
            Ok(None)
        }
    }
}

fn classify(line: &str) -> Record<'_> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() || line.starts_with(':') {
        return Record::Skip;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Record::Skip;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        Record::Done
    } else {
        Record::Payload(payload)
    }
}

/// Per-request stream state.
///
/// Created when a request begins and dropped when it ends; never shared.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    decoder: Utf8StreamDecoder,
    pending_text: String,
    assembled: String,
    done: bool,
    stall_logged: bool,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes. Returns the full reply text after every
    /// fragment this chunk completed, oldest first.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut snapshots = Vec::new();
        if self.done {
            return snapshots;
        }
        let text = self.decoder.decode(chunk);
        self.pending_text.push_str(&text);

        while let Some(newline) = self.pending_text.find('\n') {
            let raw: String = self.pending_text.drain(..=newline).collect();
            match classify(&raw[..newline]) {
                Record::Skip => continue,
                Record::Done => {
                    debug!("received [DONE] sentinel");
                    self.done = true;
                    break;
                }
                Record::Payload(payload) => match parse_payload(payload) {
                    Ok(Some(parsed)) => self.apply(&parsed, &mut snapshots),
                    Ok(None) => {}
                    Err(e) => {
                        // Line ended early; retry it once more bytes arrive.
                        debug!(error = %e, "deferring unparsable data line");
                        self.pending_text.insert_str(0, &raw);
                        if self.pending_text.len() > DEFERRED_WARN_BYTES && !self.stall_logged {
                            warn!(
                                deferred_bytes = self.pending_text.len(),
                                "data line still unparsable, stream output is stalled"
                            );
                            self.stall_logged = true;
                        }
                        break;
                    }
                },
            }
        }

        snapshots
    }

    /// Flush whatever is left once the byte stream has ended.
    ///
    /// Remaining lines are processed even without a trailing newline.
    /// Payloads that still do not parse are dropped.
    pub fn finish(&mut self) -> Vec<String> {
        let mut snapshots = Vec::new();
        if self.done {
            return snapshots;
        }
        let tail = self.decoder.finish();
        self.pending_text.push_str(&tail);
        let leftover = std::mem::take(&mut self.pending_text);

        for line in leftover.split('\n') {
            match classify(line) {
                Record::Skip => {}
                Record::Done => {
                    self.done = true;
                    break;
                }
                Record::Payload(payload) => match parse_payload(payload) {
                    Ok(Some(parsed)) => self.apply(&parsed, &mut snapshots),
                    Ok(None) => {}
                    Err(e) => debug!(error = %e, "dropping partial leftover at end of stream"),
                },
            }
        }

        snapshots
    }

    fn apply(&mut self, chunk: &StreamChunk, snapshots: &mut Vec<String>) {
        match chunk.delta_content() {
            Some(fragment) if !fragment.is_empty() => {
                trace!(fragment, "appending delta");
                self.assembled.push_str(fragment);
                snapshots.push(self.assembled.clone());
            }
            _ => {}
        }
    }

    /// Reply text assembled so far.
    pub fn text(&self) -> &str {
        &self.assembled
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Decoded text not yet consumed as a complete line.
    pub fn pending(&self) -> &str {
        &self.pending_text
    }

    /// True once a deferred line has held back more than 64 KiB of text.
    pub fn is_stalled(&self) -> bool {
        self.stall_logged
    }
}
