//! Incremental decoder for the chat endpoint's event stream
//!
//! The endpoint answers with newline-delimited records of the form
//! `data: <json>` and finishes with `data: [DONE]`. Bytes arrive in
//! arbitrary chunks, so the decoder keeps a rolling buffer and only ever
//! interprets complete lines.

use crate::types::StreamChunk;

const DATA_PREFIX: &str = "data: ";
const COMMENT_PREFIX: char = ':';
const DONE_SENTINEL: &str = "[DONE]";

/// A decoded record
#[derive(Debug, Clone)]
pub enum SseFrame {
    /// A parsed `data:` payload
    Chunk(StreamChunk),
    /// The termination sentinel was observed
    Done,
}

/// Turns raw body bytes into [`SseFrame`]s
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    /// Trailing bytes of a UTF-8 sequence split across chunks
    pending: Vec<u8>,
    done: bool,
    /// Line pushed back on the previous feed because it failed to parse
    stalled: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the termination sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one chunk of the body and return every record it completed.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        if self.done {
            return Vec::new();
        }
        self.push_bytes(bytes);
        self.drain_lines()
    }

    /// Flush whatever is left once the transport has ended.
    ///
    /// Lines that still fail to parse are dropped silently.
    pub fn finish(&mut self) -> Vec<SseFrame> {
        if self.done {
            return Vec::new();
        }
        if !self.pending.is_empty() {
            self.buffer.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
        self.stalled = None;

        let rest = std::mem::take(&mut self.buffer);
        let mut frames = Vec::new();
        for raw in rest.split('\n') {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let Some(payload) = data_payload(line) else {
                continue;
            };
            if payload == DONE_SENTINEL {
                self.done = true;
                frames.push(SseFrame::Done);
                break;
            }
            if let Ok(chunk) = serde_json::from_str::<StreamChunk>(payload) {
                frames.push(SseFrame::Chunk(chunk));
            }
        }
        frames
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        self.buffer.push_str(text);
                    }
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for the next chunk
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Vec<SseFrame> {
        let mut frames = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }

            let Some(payload) = data_payload(&line) else {
                continue;
            };

            if payload == DONE_SENTINEL {
                self.done = true;
                self.buffer.clear();
                frames.push(SseFrame::Done);
                break;
            }

            match serde_json::from_str::<StreamChunk>(payload) {
                Ok(chunk) => {
                    self.stalled = None;
                    frames.push(SseFrame::Chunk(chunk));
                }
                Err(e) if self.stalled.as_deref() == Some(line.as_str()) => {
                    tracing::warn!("Dropping malformed stream record: {}", e);
                    self.stalled = None;
                }
                Err(e) => {
                    tracing::debug!("Re-buffering unparsed stream record: {}", e);
                    self.buffer.insert(0, '\n');
                    self.buffer.insert_str(0, &line);
                    self.stalled = Some(line);
                    break;
                }
            }
        }

        frames
    }
}

/// Extract the payload of a `data:` line, skipping blanks and comments.
fn data_payload(line: &str) -> Option<&str> {
    if line.trim().is_empty() || line.starts_with(COMMENT_PREFIX) {
        return None;
    }
    line.strip_prefix(DATA_PREFIX).map(str::trim)
}
