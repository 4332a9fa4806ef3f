//! Flags accumulated across one scheduling dialogue

use serde::{Deserialize, Serialize};

/// Where the scheduling dialogue currently stands.
///
/// Derived from [`ConversationContext`]; never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowPhase {
    Idle,
    /// A slot is chosen, meeting details are still missing
    AwaitingPurpose,
    /// Details supplied, confirmation shown
    Scheduled,
    /// Reminder/sign-up offers after scheduling
    PostScheduleOffer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub calendar_connected: bool,
    pub selected_time_slot: Option<String>,
    pub awaiting_purpose: bool,
    pub meeting_details: Option<String>,
    pub reference_code: Option<String>,
    /// Last slot delivered by the calendar component, kept across flows
    pub last_external_slot: Option<String>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FlowPhase {
        if self.reference_code.is_some() {
            FlowPhase::PostScheduleOffer
        } else if self.awaiting_purpose {
            FlowPhase::AwaitingPurpose
        } else if self.selected_time_slot.is_some() && self.meeting_details.is_some() {
            FlowPhase::Scheduled
        } else {
            FlowPhase::Idle
        }
    }

    /// Record a newly chosen slot; returns false if it is a repeat of the
    /// last calendar notification.
    pub fn observe_external_slot(&mut self, slot: &str) -> bool {
        if self.last_external_slot.as_deref() == Some(slot) {
            return false;
        }
        self.last_external_slot = Some(slot.to_string());
        true
    }

    /// Select a slot for the current flow.
    ///
    /// Choosing a different slot starts a new flow, so details and reference
    /// code from the previous meeting are discarded.
    pub fn select_slot(&mut self, slot: impl Into<String>) {
        let slot = slot.into();
        if self.selected_time_slot.as_deref() != Some(slot.as_str()) {
            self.meeting_details = None;
            self.reference_code = None;
        }
        self.selected_time_slot = Some(slot);
    }

    /// Start a new scheduling flow
    pub fn reset_flow(&mut self) {
        self.selected_time_slot = None;
        self.awaiting_purpose = false;
        self.meeting_details = None;
        self.reference_code = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases() {
        let mut ctx = ConversationContext::new();
        assert_eq!(ctx.phase(), FlowPhase::Idle);

        ctx.select_slot("June 5th, 2025 at 2:00 PM");
        ctx.awaiting_purpose = true;
        assert_eq!(ctx.phase(), FlowPhase::AwaitingPurpose);

        ctx.awaiting_purpose = false;
        ctx.meeting_details = Some("Quarterly review".into());
        assert_eq!(ctx.phase(), FlowPhase::Scheduled);

        ctx.reference_code = Some("HT-ABC123".into());
        assert_eq!(ctx.phase(), FlowPhase::PostScheduleOffer);

        ctx.reset_flow();
        assert_eq!(ctx.phase(), FlowPhase::Idle);
    }

    #[test]
    fn test_duplicate_external_slot() {
        let mut ctx = ConversationContext::new();
        assert!(ctx.observe_external_slot("10:00 AM"));
        assert!(!ctx.observe_external_slot("10:00 AM"));
        assert!(ctx.observe_external_slot("11:00 AM"));
        assert!(ctx.observe_external_slot("10:00 AM"));
    }

    #[test]
    fn test_reset_keeps_duplicate_guard_and_calendar() {
        let mut ctx = ConversationContext::new();
        ctx.calendar_connected = true;
        ctx.observe_external_slot("10:00 AM");
        ctx.reset_flow();
        assert!(ctx.calendar_connected);
        assert!(!ctx.observe_external_slot("10:00 AM"));
    }

    #[test]
    fn test_reselecting_same_slot_keeps_details() {
        let mut ctx = ConversationContext::new();
        ctx.select_slot("9:00 AM");
        ctx.meeting_details = Some("Intro".into());
        ctx.select_slot("9:00 AM");
        assert_eq!(ctx.meeting_details.as_deref(), Some("Intro"));
        ctx.select_slot("3:00 PM");
        assert_eq!(ctx.meeting_details, None);
    }
}
