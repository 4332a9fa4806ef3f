//! Chat widget event types

use serde::{Deserialize, Serialize};

use crate::flow::MeetingRequest;
use crate::message::{Message, QuickAction};

/// Events emitted while the chat widget runs, in the order they happen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A message was appended to the store
    MessageAppended { index: usize, message: Message },

    /// The streaming message grew; `content` is the full text so far
    MessageUpdated { index: usize, content: String },

    /// The streaming message is complete and immutable
    MessageSealed { index: usize },

    /// Quick actions were attached to an existing message
    ActionsAttached {
        index: usize,
        actions: Vec<QuickAction>,
    },

    /// The typing indicator changed
    TypingChanged { is_typing: bool },

    /// A meeting was confirmed
    MeetingScheduled { meeting: MeetingRequest },

    /// The host should open an external destination
    OpenUrl { url: String },

    /// The reply failed; an apology message follows. `transport` is false
    /// when the endpoint was misconfigured or the store rejected the reply.
    Error { message: String, transport: bool },
}
