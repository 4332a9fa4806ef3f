//! htime-ai: Streaming chat-completion client
//!
//! This crate speaks to the hosted chat endpoint behind the hTime assistant:
//! it serialises conversation history, decodes the event-stream response and
//! accumulates incremental content into a growing reply.

pub mod accumulator;
pub mod client;
pub mod decoder;
pub mod error;
pub mod types;

pub use accumulator::DeltaAccumulator;
pub use client::{ChatEndpoint, ChatStream, HttpChatEndpoint, StreamEvent, decode_stream};
pub use decoder::{SseDecoder, SseFrame};
pub use error::{Error, Result};
pub use types::*;
