//! Conversation flow controller
//!
//! Turns user input (typed text, quick-action clicks, calendar selections)
//! into a list of [`Effect`]s for the session to carry out. The controller
//! owns the [`ConversationContext`] and never touches the message store or
//! the network itself, so every transition can be tested without I/O.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    context::{ConversationContext, FlowPhase},
    message::{ActionKind, Payload, QuickAction, payload_str},
    profile::ProfileConfig,
    random::RandomSource,
};

/// Default pause before the assistant asks for the meeting purpose
pub const DEFAULT_PURPOSE_PROMPT_DELAY: Duration = Duration::from_millis(800);

/// Replies mentioning what the meeting is about are treated as ready to confirm.
// TODO: replace with a structured metadata block once the chat endpoint emits one
static MEETING_ABOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)meeting\s+about[:\s]*([^.!?\n]*)").expect("static regex")
});

/// Meeting data handed to the host page once a meeting is confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub time: String,
    pub details: String,
}

/// Something the session must do as the result of a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AppendUser(String),
    AppendAssistant {
        content: String,
        actions: Vec<QuickAction>,
    },
    /// Append after a pause, e.g. to let a selection "sink in"
    AppendAssistantAfter {
        delay: Duration,
        content: String,
        actions: Vec<QuickAction>,
    },
    /// Send the history to the chat endpoint; `follow_up` asks for
    /// quick actions to be attached to the reply once it completes
    RequestCompletion { follow_up: bool },
    NotifyScheduled(MeetingRequest),
    OpenUrl(String),
}

/// Result of a transition
#[derive(Debug, Default, PartialEq)]
pub struct Transition {
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn user(self, content: impl Into<String>) -> Self {
        self.with_effect(Effect::AppendUser(content.into()))
    }

    fn assistant(self, content: impl Into<String>, actions: Vec<QuickAction>) -> Self {
        self.with_effect(Effect::AppendAssistant {
            content: content.into(),
            actions,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Whether this transition talks to the chat endpoint
    pub fn requests_completion(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, Effect::RequestCompletion { .. }))
    }
}

pub struct FlowController {
    context: ConversationContext,
    profile: ProfileConfig,
    rng: Box<dyn RandomSource>,
    purpose_prompt_delay: Duration,
}

impl FlowController {
    pub fn new(profile: ProfileConfig, rng: Box<dyn RandomSource>) -> Self {
        Self {
            context: ConversationContext::default(),
            profile,
            rng,
            purpose_prompt_delay: DEFAULT_PURPOSE_PROMPT_DELAY,
        }
    }

    pub fn with_purpose_prompt_delay(mut self, delay: Duration) -> Self {
        self.purpose_prompt_delay = delay;
        self
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn phase(&self) -> FlowPhase {
        self.context.phase()
    }

    pub fn profile(&self) -> &ProfileConfig {
        &self.profile
    }

    /// Forget everything, as when the widget is remounted
    pub fn reset(&mut self) {
        self.context = ConversationContext::default();
    }

    /// Free text typed by the user
    pub fn on_text(&mut self, input: &str) -> Transition {
        let text = input.trim();
        if text.is_empty() {
            return Transition::none();
        }

        if self.context.awaiting_purpose {
            if let Some(time) = self.context.selected_time_slot.clone() {
                return self.confirm(Transition::none().user(text), time, text.to_string());
            }
        }

        Transition::none()
            .user(text)
            .with_effect(Effect::RequestCompletion { follow_up: false })
    }

    /// A slot chosen in the companion calendar component.
    ///
    /// The same slot delivered twice in a row is ignored.
    pub fn on_time_slot(&mut self, slot: &str) -> Transition {
        let slot = slot.trim();
        if slot.is_empty() || !self.context.observe_external_slot(slot) {
            tracing::debug!("Ignoring repeated time slot notification: {:?}", slot);
            return Transition::none();
        }

        self.context.select_slot(slot);
        self.context.awaiting_purpose = true;

        Transition::none()
            .user(format!("I'd like to schedule a meeting for {}.", slot))
            .with_effect(Effect::AppendAssistantAfter {
                delay: self.purpose_prompt_delay,
                content: purpose_prompt(slot),
                actions: vec![QuickAction::new("Enter meeting details", ActionKind::EnterDetails)],
            })
    }

    /// A quick action triggered by a button or by the host page
    pub fn on_action(
        &mut self,
        kind: ActionKind,
        label: Option<&str>,
        payload: Option<&Payload>,
    ) -> Transition {
        match kind {
            ActionKind::ConnectCalendar => {
                self.context.calendar_connected = true;
                Transition::none().assistant(
                    "Your calendar is connected! I'll use your availability to suggest times that work for both of us.",
                    vec![],
                )
            }
            ActionKind::EnterDetails => Transition::none().assistant(
                "Sure! Type a short description of what you'd like to discuss and send it.",
                vec![],
            ),
            ActionKind::ConfirmMeeting => self.on_confirm(payload),
            ActionKind::Signup => {
                let mut actions = vec![];
                if self.profile.meeting_reminders() {
                    actions.push(QuickAction::new("Set reminder", ActionKind::SetReminder));
                }
                Transition::none()
                    .with_effect(Effect::OpenUrl(self.profile.signup_url()))
                    .assistant(
                        "I've opened the sign-up page for you. Meanwhile, would you like me to set a reminder for your meeting?",
                        actions,
                    )
            }
            ActionKind::SetReminder => {
                let code = self.rng.reference_code();
                self.context.reference_code = Some(code.clone());
                let when = self
                    .context
                    .selected_time_slot
                    .as_deref()
                    .map(|slot| format!(" before your meeting on {}", slot))
                    .unwrap_or_default();
                Transition::none().assistant(
                    format!(
                        "Reminder set! I'll notify you{}. Your reference code is {}.",
                        when, code
                    ),
                    vec![
                        QuickAction::new("Continue chatting", ActionKind::ContinueChat),
                        QuickAction::new("Close conversation", ActionKind::CloseConversation),
                    ],
                )
            }
            ActionKind::CloseConversation => {
                let content = match self.context.reference_code.as_deref() {
                    Some(code) => format!(
                        "Thanks for scheduling with us! Keep your reference code {} handy. See you soon!",
                        code
                    ),
                    None => "Thanks for chatting! Have a great day.".to_string(),
                };
                self.context.reset_flow();
                Transition::none().assistant(content, vec![])
            }
            ActionKind::ContinueChat => {
                Transition::none().assistant("Of course! What else can I help you with?", vec![])
            }
            ActionKind::Schedule => Transition::none()
                .user(label.unwrap_or("I'd like to schedule a meeting"))
                .with_effect(Effect::RequestCompletion { follow_up: true }),
            ActionKind::SelectTime => {
                let transition = match payload_str(payload, "time") {
                    Some(time) => {
                        self.context.select_slot(time);
                        Transition::none().user(format!("I'd like to meet at {}.", time))
                    }
                    None => Transition::none().user(label.unwrap_or("Show me the available times")),
                };
                transition.with_effect(Effect::RequestCompletion { follow_up: true })
            }
            ActionKind::Generic => {
                let Some(text) = payload_str(payload, "text").or(label) else {
                    return Transition::none();
                };
                self.on_text(text)
            }
        }
    }

    /// Quick actions to attach to a reply that was requested with `follow_up`.
    ///
    /// Without `enable_interactive_buttons` no actions are attached.
    pub fn follow_up_actions(&self, reply: &str) -> Vec<QuickAction> {
        if !self.profile.interactive_buttons() {
            return vec![];
        }

        if let Some(caps) = MEETING_ABOUT.captures(reply) {
            let mut confirm = QuickAction::new("Confirm meeting", ActionKind::ConfirmMeeting);
            if let Some(slot) = self.context.selected_time_slot.as_deref() {
                confirm = confirm.with("time", slot);
            }
            if let Some(details) = caps.get(1).map(|m| m.as_str().trim()).filter(|s| !s.is_empty()) {
                confirm = confirm.with("details", details);
            }
            return vec![
                confirm,
                QuickAction::new("Pick another time", ActionKind::SelectTime),
            ];
        }

        self.profile
            .available_time_slots()
            .into_iter()
            .map(|slot| QuickAction::new(slot.clone(), ActionKind::SelectTime).with("time", slot))
            .collect()
    }

    fn on_confirm(&mut self, payload: Option<&Payload>) -> Transition {
        let time = payload_str(payload, "time")
            .map(str::to_string)
            .or_else(|| self.context.selected_time_slot.clone());
        let details = payload_str(payload, "details")
            .map(str::to_string)
            .or_else(|| self.context.meeting_details.clone());

        match (time, details) {
            (Some(time), Some(details)) => self.confirm(Transition::none(), time, details),
            (Some(time), None) => {
                self.context.select_slot(time.clone());
                self.context.awaiting_purpose = true;
                Transition::none().assistant(
                    purpose_prompt(&time),
                    vec![QuickAction::new("Enter meeting details", ActionKind::EnterDetails)],
                )
            }
            (None, _) => {
                let slots = self
                    .profile
                    .available_time_slots()
                    .into_iter()
                    .map(|slot| {
                        QuickAction::new(slot.clone(), ActionKind::SelectTime).with("time", slot)
                    })
                    .collect();
                Transition::none().assistant(
                    "Please pick a time slot first so I can confirm your meeting.",
                    slots,
                )
            }
        }
    }

    fn confirm(&mut self, transition: Transition, time: String, details: String) -> Transition {
        self.context.select_slot(time.clone());
        self.context.meeting_details = Some(details.clone());
        self.context.awaiting_purpose = false;

        let mut actions = vec![QuickAction::new("Create account", ActionKind::Signup)];
        if self.profile.meeting_reminders() {
            actions.push(QuickAction::new("Set reminder", ActionKind::SetReminder));
        }

        transition
            .assistant(
                format!(
                    "Perfect! Your meeting is scheduled for {}.\n\nMeeting about: {}\n\nWould you like to create an account to manage your meetings, or set a reminder?",
                    time, details
                ),
                actions,
            )
            .with_effect(Effect::NotifyScheduled(MeetingRequest { time, details }))
    }
}

fn purpose_prompt(slot: &str) -> String {
    format!(
        "Great choice! {} works. What would you like to discuss in this meeting?",
        slot
    )
}
