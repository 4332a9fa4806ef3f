//! Merges incremental content fragments into a single reply

use crate::types::StreamChunk;

/// Running buffer for the assistant reply being streamed
#[derive(Debug, Default, Clone)]
pub struct DeltaAccumulator {
    text: String,
    fragments: usize,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the chunk's first-choice content.
    ///
    /// Returns the whole buffer after the append, or `None` when the chunk
    /// carried no content and nothing changed.
    pub fn apply(&mut self, chunk: &StreamChunk) -> Option<&str> {
        let fragment = chunk.delta_content()?;
        self.push(fragment);
        Some(&self.text)
    }

    /// Append a raw fragment
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of fragments appended so far
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments == 0
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(json: &str) -> StreamChunk {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_accumulates_in_order() {
        let mut acc = DeltaAccumulator::new();
        assert_eq!(
            acc.apply(&chunk(r#"{"choices":[{"delta":{"content":"Quarterly"}}]}"#)),
            Some("Quarterly")
        );
        assert_eq!(
            acc.apply(&chunk(r#"{"choices":[{"delta":{"content":" review"}}]}"#)),
            Some("Quarterly review")
        );
        assert_eq!(acc.fragments(), 2);
    }

    #[test]
    fn test_ignores_chunks_without_content() {
        let mut acc = DeltaAccumulator::new();
        assert_eq!(acc.apply(&chunk(r#"{"choices":[{"delta":{}}]}"#)), None);
        assert_eq!(acc.apply(&chunk(r#"{"choices":[]}"#)), None);
        assert!(acc.is_empty());
        assert_eq!(acc.into_text(), "");
    }

    #[test]
    fn test_empty_fragment_counts() {
        let mut acc = DeltaAccumulator::new();
        assert_eq!(acc.apply(&chunk(r#"{"choices":[{"delta":{"content":""}}]}"#)), Some(""));
        assert!(!acc.is_empty());
    }
}
