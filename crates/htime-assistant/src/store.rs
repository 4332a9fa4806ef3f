//! Ordered, append-only log of exchanged messages.
//!
//! The only mutable entry is the assistant message currently being streamed,
//! addressed through a [`StreamingIndex`] handed out by [`MessageStore::begin_stream`].

use crate::error::{Error, Result};
use crate::message::{Message, QuickAction};

/// Proof that a message is open for streaming.
///
/// Not `Clone`: exactly one exists per open message, and sealing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct StreamingIndex(usize);

impl StreamingIndex {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    streaming: Option<usize>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished message and return its index
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Append an empty assistant message and open it for streaming
    pub fn begin_stream(&mut self) -> Result<StreamingIndex> {
        if let Some(open) = self.streaming {
            return Err(Error::Stream(format!(
                "message {} is still streaming",
                open
            )));
        }
        let index = self.append(Message::assistant(String::new()));
        self.streaming = Some(index);
        Ok(StreamingIndex(index))
    }

    /// Replace the content of the open message
    pub fn update_last(&mut self, stream: &StreamingIndex, content: impl Into<String>) -> Result<()> {
        if self.streaming != Some(stream.0) {
            return Err(Error::Stream(format!(
                "message {} is not open for streaming",
                stream.0
            )));
        }
        let message = self
            .messages
            .get_mut(stream.0)
            .ok_or_else(|| Error::Stream(format!("no message at index {}", stream.0)))?;
        message.content = content.into();
        Ok(())
    }

    /// Close the open message; it is immutable from now on
    pub fn seal(&mut self, stream: StreamingIndex) -> usize {
        if self.streaming == Some(stream.0) {
            self.streaming = None;
        }
        stream.0
    }

    /// Append quick actions to an existing message
    pub fn attach_actions(&mut self, index: usize, actions: Vec<QuickAction>) -> Result<()> {
        let message = self
            .messages
            .get_mut(index)
            .ok_or_else(|| Error::Stream(format!("no message at index {}", index)))?;
        message.actions.extend(actions);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Drop every message, e.g. when the widget is remounted
    pub fn clear(&mut self) {
        self.messages.clear();
        self.streaming = None;
    }
}
