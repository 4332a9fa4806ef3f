//! Live networking session: attendees scan a code, fill in a short form and
//! show up on the host's participant list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::StateRepository;

pub const DEFAULT_SESSION_CODE: &str = "HTM-2024-001";

const PARTICIPANTS_KEY: &str = "session-participants";
const ACTIVE_KEY: &str = "session-active";

/// What an attendee submits when joining
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub linkedin_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    #[serde(flatten)]
    pub form: ParticipantForm,
    pub joined_at: DateTime<Utc>,
    pub session_code: String,
}

impl Participant {
    /// Initials for the avatar, e.g. "SC" for "Sarah Chen"
    pub fn initials(&self) -> String {
        self.form
            .name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .collect()
    }
}

pub struct LiveSession {
    code: String,
    repo: Arc<dyn StateRepository>,
}

impl LiveSession {
    pub fn new(repo: Arc<dyn StateRepository>) -> Self {
        Self::with_code(DEFAULT_SESSION_CODE, repo)
    }

    pub fn with_code(code: impl Into<String>, repo: Arc<dyn StateRepository>) -> Self {
        Self {
            code: code.into(),
            repo,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Path attendees open to join
    pub fn join_path(&self) -> String {
        format!("/join/{}", self.code)
    }

    /// Add an attendee. Name and email are required.
    pub fn join(&self, form: ParticipantForm) -> Result<Participant> {
        if form.name.trim().is_empty() || form.email.trim().is_empty() {
            return Err(Error::Validation("Name and email are required".to_string()));
        }

        let participant = Participant {
            id: Uuid::new_v4(),
            form,
            joined_at: Utc::now(),
            session_code: self.code.clone(),
        };

        let mut participants = self.participants()?;
        participants.push(participant.clone());
        self.repo
            .set(PARTICIPANTS_KEY, serde_json::to_value(&participants)?)?;
        self.repo.set(ACTIVE_KEY, serde_json::Value::Bool(true))?;

        tracing::info!(
            "{} joined live session {}",
            participant.form.name,
            self.code
        );
        Ok(participant)
    }

    /// Everyone who joined, in arrival order
    pub fn participants(&self) -> Result<Vec<Participant>> {
        match self.repo.get(PARTICIPANTS_KEY)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// A session is active until ended; a fresh session counts as active
    pub fn is_active(&self) -> Result<bool> {
        Ok(self
            .repo
            .get(ACTIVE_KEY)?
            .and_then(|v| v.as_bool())
            .unwrap_or(true))
    }

    /// End the session and forget its participants
    pub fn end(&self) -> Result<()> {
        self.repo.clear(PARTICIPANTS_KEY)?;
        self.repo.set(ACTIVE_KEY, serde_json::Value::Bool(false))?;
        tracing::info!("Ended live session {}", self.code);
        Ok(())
    }
}
