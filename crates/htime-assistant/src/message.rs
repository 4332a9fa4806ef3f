//! Chat messages and the quick actions attached to them

use chrono::{DateTime, Utc};
use htime_ai::{Role, WireMessage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Free-form data carried by a quick action
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// The fixed catalogue of quick-action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    ConnectCalendar,
    EnterDetails,
    SelectTime,
    ConfirmMeeting,
    SetReminder,
    CloseConversation,
    ContinueChat,
    Schedule,
    Signup,
    Generic,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::ConnectCalendar,
        ActionKind::EnterDetails,
        ActionKind::SelectTime,
        ActionKind::ConfirmMeeting,
        ActionKind::SetReminder,
        ActionKind::CloseConversation,
        ActionKind::ContinueChat,
        ActionKind::Schedule,
        ActionKind::Signup,
        ActionKind::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ConnectCalendar => "connect-calendar",
            ActionKind::EnterDetails => "enter-details",
            ActionKind::SelectTime => "select-time",
            ActionKind::ConfirmMeeting => "confirm-meeting",
            ActionKind::SetReminder => "set-reminder",
            ActionKind::CloseConversation => "close-conversation",
            ActionKind::ContinueChat => "continue-chat",
            ActionKind::Schedule => "schedule",
            ActionKind::Signup => "signup",
            ActionKind::Generic => "generic",
        }
    }

    /// Parse a kind tag, mapping anything unknown to `Generic`
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(ActionKind::Generic)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        ActionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("unknown action kind: {}", s))
    }
}

/// A labeled button attached to an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickAction {
    pub label: String,
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl QuickAction {
    pub fn new(label: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            payload: None,
        }
    }

    /// Attach one payload entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload
            .get_or_insert_with(Payload::new)
            .insert(key.into(), value.into());
        self
    }

    /// Read a string entry from the payload
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        payload_str(self.payload.as_ref(), key)
    }
}

/// Read a non-empty string entry from an optional payload
pub fn payload_str<'a>(payload: Option<&'a Payload>, key: &str) -> Option<&'a str> {
    payload
        .and_then(|p| p.get(key))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// One entry of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<QuickAction>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            actions: vec![],
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            actions: vec![],
        }
    }

    pub fn with_actions(mut self, actions: Vec<QuickAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// The role/content pair sent to the chat endpoint
    pub fn to_wire(&self) -> WireMessage {
        WireMessage::new(self.role, self.content.clone())
    }
}
