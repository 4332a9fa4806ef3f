//! Offline responder that streams canned replies.
//!
//! Used when no chat endpoint is configured. The reply catalogue depends on
//! the profile's interaction level, read from the request's `config` object,
//! so one responder serves any profile.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use htime_ai::{ChatEndpoint, ChatRequest, ChatStream, StreamEvent};
use parking_lot::Mutex;

use crate::profile::{InteractionLevel, ProfileConfig};
use crate::random::{RandomSource, SeededRandom, pick};

/// Default pause before the first word, mimicking thinking time
pub const DEFAULT_THINKING_DELAY: Duration = Duration::from_millis(1500);

pub struct CannedEndpoint {
    rng: Mutex<Box<dyn RandomSource>>,
    thinking_delay: Duration,
    word_delay: Duration,
}

impl CannedEndpoint {
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self {
            rng: Mutex::new(rng),
            thinking_delay: DEFAULT_THINKING_DELAY,
            word_delay: Duration::from_millis(40),
        }
    }

    /// Instant replies, for tests
    pub fn immediate(rng: Box<dyn RandomSource>) -> Self {
        Self::new(rng).with_delays(Duration::ZERO, Duration::ZERO)
    }

    pub fn with_delays(mut self, thinking: Duration, per_word: Duration) -> Self {
        self.thinking_delay = thinking;
        self.word_delay = per_word;
        self
    }

    /// Choose the reply for the given profile
    pub fn choose_reply(&self, profile: &ProfileConfig) -> String {
        let replies = replies_for(profile);
        let mut rng = self.rng.lock();
        pick(rng.as_mut(), &replies).cloned().unwrap_or_default()
    }
}

impl Default for CannedEndpoint {
    fn default() -> Self {
        Self::new(Box::new(SeededRandom::from_entropy()))
    }
}

/// The catalogue of replies for a profile
pub fn replies_for(profile: &ProfileConfig) -> Vec<String> {
    match profile.interaction_level() {
        InteractionLevel::Basic => vec![
            "Thank you for your message. I'll get back to you soon.".to_string(),
            "Message received. How can I help you today?".to_string(),
            "I'm here to assist. What do you need?".to_string(),
        ],
        InteractionLevel::Full => {
            let calendar = if profile.calendar_integration() {
                "Would you like to connect your Google Calendar for easier scheduling?"
            } else {
                "Let me check the available time slots."
            };
            let smart = if profile.smart_scheduling() {
                "Based on the calendar, I can suggest optimal meeting times. Do you need something ASAP or are you flexible?"
            } else {
                "I can help you find a time slot."
            };
            let purpose = if profile.require_meeting_purpose() {
                "Could you briefly share the purpose or context for this meeting?"
            } else {
                "What timeframe works best?"
            };
            vec![
                format!("I understand you're looking to schedule a meeting. {calendar}"),
                format!("Thank you for reaching out! {smart}"),
                format!("I'd be happy to coordinate this meeting. {purpose}"),
            ]
        }
        InteractionLevel::Standard => vec![
            "I understand you're looking to schedule a meeting. Let me help you find the best time slot.".to_string(),
            "Thank you for reaching out! I can assist you with scheduling and availability.".to_string(),
            "Based on the current calendar, I can suggest meeting times for you.".to_string(),
        ],
    }
}

/// Split a reply into word fragments that concatenate back to the original
fn fragments(reply: &str) -> Vec<String> {
    reply
        .split_inclusive(' ')
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl ChatEndpoint for CannedEndpoint {
    async fn stream(&self, request: &ChatRequest) -> htime_ai::Result<ChatStream> {
        let profile = ProfileConfig::new(request.config.clone());
        let reply = self.choose_reply(&profile);
        tracing::debug!(
            "Canned reply for {:?} profile ({} history messages)",
            profile.interaction_level(),
            request.messages.len()
        );

        let thinking = self.thinking_delay;
        let per_word = self.word_delay;

        Ok(Box::pin(stream! {
            if !thinking.is_zero() {
                tokio::time::sleep(thinking).await;
            }
            for content in fragments(&reply) {
                if !per_word.is_zero() {
                    tokio::time::sleep(per_word).await;
                }
                yield StreamEvent::Delta { content };
            }
            yield StreamEvent::Done;
        }))
    }
}
