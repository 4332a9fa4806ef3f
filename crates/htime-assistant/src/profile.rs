//! Public profile (hIP) configuration as seen by the chat widget.
//!
//! The configuration is an opaque JSON object owned by the persistence
//! service. It is forwarded verbatim to the chat endpoint, and the widget
//! reads a handful of feature flags from it. Every read tolerates absence
//! (or a value of the wrong type) and falls back to the default listed on
//! the accessor.

use serde::{Deserialize, Serialize};

/// Time slots offered when the profile lists none
pub const DEFAULT_TIME_SLOTS: [&str; 6] = [
    "09:00 AM", "10:00 AM", "11:00 AM", "02:00 PM", "03:00 PM", "04:00 PM",
];

/// Where the sign-up action sends visitors when the profile sets no URL
pub const DEFAULT_SIGNUP_URL: &str = "/auth";

/// How chatty the assistant is configured to be
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionLevel {
    Basic,
    #[default]
    Standard,
    Full,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileConfig(serde_json::Value);

impl ProfileConfig {
    pub fn new(raw: serde_json::Value) -> Self {
        Self(raw)
    }

    /// The raw configuration, as forwarded to the endpoint
    pub fn raw(&self) -> &serde_json::Value {
        &self.0
    }

    /// Read a boolean flag; `null`, missing, or non-boolean values yield `default`
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.0
            .get(name)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    fn string(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Attach quick-action buttons to streamed replies (default: off)
    pub fn interactive_buttons(&self) -> bool {
        self.flag("enable_interactive_buttons", false)
    }

    /// Offer calendar connection (default: off)
    pub fn calendar_integration(&self) -> bool {
        self.flag("enable_calendar_integration", false)
    }

    /// Offer reminders after scheduling (default: on)
    pub fn meeting_reminders(&self) -> bool {
        self.flag("enable_meeting_reminders", true)
    }

    /// Ask for the meeting purpose after a slot is chosen (default: on)
    pub fn require_meeting_purpose(&self) -> bool {
        self.flag("require_meeting_purpose", true)
    }

    /// Suggest optimal times in canned replies (default: off)
    pub fn smart_scheduling(&self) -> bool {
        self.flag("show_smart_scheduling", false)
    }

    /// Interaction level (default: standard; unknown values are standard too)
    pub fn interaction_level(&self) -> InteractionLevel {
        match self.string("assistant_interaction_level") {
            Some(level) if level.eq_ignore_ascii_case("basic") => InteractionLevel::Basic,
            Some(level) if level.eq_ignore_ascii_case("full") => InteractionLevel::Full,
            _ => InteractionLevel::Standard,
        }
    }

    /// Slots offered as `select-time` buttons (default: [`DEFAULT_TIME_SLOTS`])
    pub fn available_time_slots(&self) -> Vec<String> {
        let slots: Vec<String> = self
            .0
            .get("available_time_slots")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if slots.is_empty() {
            DEFAULT_TIME_SLOTS.iter().map(|s| s.to_string()).collect()
        } else {
            slots
        }
    }

    /// Sign-up destination (default: [`DEFAULT_SIGNUP_URL`])
    pub fn signup_url(&self) -> String {
        self.string("signup_url")
            .unwrap_or(DEFAULT_SIGNUP_URL)
            .to_string()
    }
}

impl From<serde_json::Value> for ProfileConfig {
    fn from(raw: serde_json::Value) -> Self {
        Self::new(raw)
    }
}
