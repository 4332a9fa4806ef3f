//! htime-assistant: Conversation runtime for the hTime scheduling assistant
//!
//! This crate provides the chat widget embedded in a public profile page:
//! the message store, the scheduling flow, the streaming reply loop, and the
//! small amount of persisted state used by live networking sessions.

pub mod canned;
pub mod context;
pub mod error;
pub mod events;
pub mod flow;
pub mod handle;
pub mod live;
pub mod message;
pub mod profile;
pub mod random;
pub mod session;
pub mod storage;
pub mod store;

pub use canned::CannedEndpoint;
pub use context::{ConversationContext, FlowPhase};
pub use error::{Error, Result};
pub use events::ChatEvent;
pub use flow::{Effect, FlowController, MeetingRequest, Transition};
pub use handle::ChatHandle;
pub use live::{LiveSession, Participant, ParticipantForm};
pub use message::{ActionKind, Message, Payload, QuickAction};
pub use profile::{InteractionLevel, ProfileConfig};
pub use random::{RandomSource, SeededRandom};
pub use session::{APOLOGY_MESSAGE, ChatSession, Dispatch, SessionOptions};
pub use storage::{FileStateRepository, InMemoryStateRepository, StateRepository};
pub use store::MessageStore;
