//! Chat widget runtime
//!
//! [`ChatSession`] wires the flow controller to the message store and the
//! chat endpoint. Every method takes `&mut self`, so a session only ever has
//! one reply in flight; callers that can double-submit should consult
//! [`ChatHandle::is_typing`] and disable input instead of queuing it.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use htime_ai::{ChatEndpoint, ChatRequest, ChatStream, DeltaAccumulator, StreamEvent};
use tokio::sync::broadcast;

use crate::{
    context::{ConversationContext, FlowPhase},
    events::ChatEvent,
    flow::{DEFAULT_PURPOSE_PROMPT_DELAY, Effect, FlowController, MeetingRequest, Transition},
    handle::ChatHandle,
    message::{ActionKind, Message, Payload, QuickAction, payload_str},
    profile::ProfileConfig,
    random::{RandomSource, SeededRandom},
    store::{MessageStore, StreamingIndex},
};

/// Appended whenever the chat endpoint cannot be reached or fails mid-reply
pub const APOLOGY_MESSAGE: &str = "I'm sorry, I encountered an error. Please try again.";

/// Called once per confirmed meeting
pub type ScheduleCallback = Box<dyn Fn(&MeetingRequest) + Send + Sync>;

/// Tunables for a chat session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Pause before the assistant asks for the meeting purpose
    pub purpose_prompt_delay: Duration,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            purpose_prompt_delay: DEFAULT_PURPOSE_PROMPT_DELAY,
            event_capacity: 256,
        }
    }
}

/// Whether an input was acted upon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// Rejected: a reply is pending, the widget is closed, or the input
    /// produced no transition (blank text, repeated time slot)
    Ignored,
}

pub struct ChatSession {
    agent_name: String,
    store: MessageStore,
    flow: FlowController,
    endpoint: Arc<dyn ChatEndpoint>,
    event_tx: broadcast::Sender<ChatEvent>,
    handle: ChatHandle,
    on_schedule: Option<ScheduleCallback>,
}

impl ChatSession {
    /// Create a session with default options and an entropy-seeded random source
    pub fn new(
        agent_name: impl Into<String>,
        profile: ProfileConfig,
        endpoint: Arc<dyn ChatEndpoint>,
    ) -> Self {
        Self::with_options(
            agent_name,
            profile,
            endpoint,
            SessionOptions::default(),
            Box::new(SeededRandom::from_entropy()),
        )
    }

    pub fn with_options(
        agent_name: impl Into<String>,
        profile: ProfileConfig,
        endpoint: Arc<dyn ChatEndpoint>,
        options: SessionOptions,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(options.event_capacity.max(1));
        let flow = FlowController::new(profile, rng)
            .with_purpose_prompt_delay(options.purpose_prompt_delay);

        let mut session = Self {
            agent_name: agent_name.into(),
            store: MessageStore::new(),
            flow,
            endpoint,
            event_tx,
            handle: ChatHandle::new(),
            on_schedule: None,
        };
        session.greet();
        session
    }

    /// Subscribe to chat events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for teardown and typing state
    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    /// Register the host page's on-schedule callback
    pub fn set_on_schedule(&mut self, f: impl Fn(&MeetingRequest) + Send + Sync + 'static) {
        self.on_schedule = Some(Box::new(f));
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn context(&self) -> &ConversationContext {
        self.flow.context()
    }

    pub fn phase(&self) -> FlowPhase {
        self.flow.phase()
    }

    pub fn is_typing(&self) -> bool {
        self.handle.is_typing()
    }

    /// Start over as if the widget had been remounted
    pub fn reset(&mut self) {
        self.store.clear();
        self.flow.reset();
        self.greet();
    }

    /// The user typed and sent a message
    pub async fn send_text(&mut self, input: &str) -> Dispatch {
        if !self.accepting_input() {
            return Dispatch::Ignored;
        }
        let transition = self.flow.on_text(input);
        self.apply(transition).await
    }

    /// Generic entry point for quick actions: `kind` is the wire tag
    /// (`"confirm-meeting"`, ...); unknown tags are handled as `generic`.
    /// An optional `label` entry in the payload is used as display text.
    pub async fn handle_action(&mut self, kind: &str, payload: Option<Payload>) -> Dispatch {
        let kind = ActionKind::parse_lenient(kind);
        let label = payload_str(payload.as_ref(), "label").map(str::to_string);
        self.dispatch_action(kind, label.as_deref(), payload.as_ref())
            .await
    }

    /// A quick-action button was clicked
    pub async fn trigger(&mut self, action: &QuickAction) -> Dispatch {
        self.dispatch_action(action.kind, Some(&action.label), action.payload.as_ref())
            .await
    }

    /// The companion calendar delivered a selected slot
    pub async fn time_slot_selected(&mut self, slot: &str) -> Dispatch {
        if !self.accepting_input() {
            return Dispatch::Ignored;
        }
        let transition = self.flow.on_time_slot(slot);
        self.apply(transition).await
    }

    async fn dispatch_action(
        &mut self,
        kind: ActionKind,
        label: Option<&str>,
        payload: Option<&Payload>,
    ) -> Dispatch {
        if !self.accepting_input() {
            return Dispatch::Ignored;
        }
        tracing::debug!("Handling action {}", kind);
        let transition = self.flow.on_action(kind, label, payload);
        self.apply(transition).await
    }

    fn accepting_input(&self) -> bool {
        !self.handle.is_closed() && !self.handle.is_typing()
    }

    fn greet(&mut self) {
        let greeting = Message::assistant(format!(
            "Hello! I'm {}. How can I help you today?",
            self.agent_name
        ));
        self.append(greeting);
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.event_tx.send(event);
    }

    fn append(&mut self, message: Message) -> usize {
        let index = self.store.append(message.clone());
        self.emit(ChatEvent::MessageAppended { index, message });
        index
    }

    fn set_typing(&self, typing: bool) {
        if self.handle.set_typing(typing) {
            self.emit(ChatEvent::TypingChanged { is_typing: typing });
        }
    }

    /// Carry out a transition's effects in order
    async fn apply(&mut self, transition: Transition) -> Dispatch {
        if transition.is_empty() {
            return Dispatch::Ignored;
        }

        for effect in transition.effects {
            if self.handle.is_closed() {
                tracing::debug!("Chat closed; dropping remaining effects");
                break;
            }

            match effect {
                Effect::AppendUser(content) => {
                    self.append(Message::user(content));
                }
                Effect::AppendAssistant { content, actions } => {
                    self.append(Message::assistant(content).with_actions(actions));
                }
                Effect::AppendAssistantAfter {
                    delay,
                    content,
                    actions,
                } => {
                    if !delay.is_zero() && !self.pause(delay).await {
                        break;
                    }
                    self.append(Message::assistant(content).with_actions(actions));
                }
                Effect::RequestCompletion { follow_up } => {
                    self.run_completion(follow_up).await;
                }
                Effect::NotifyScheduled(meeting) => {
                    tracing::debug!("Meeting scheduled for {}", meeting.time);
                    if let Some(ref callback) = self.on_schedule {
                        callback(&meeting);
                    }
                    self.emit(ChatEvent::MeetingScheduled { meeting });
                }
                Effect::OpenUrl(url) => {
                    self.emit(ChatEvent::OpenUrl { url });
                }
            }
        }

        Dispatch::Handled
    }

    /// Wait with the typing indicator on. Returns false if the widget was
    /// closed in the meantime.
    async fn pause(&self, delay: Duration) -> bool {
        self.set_typing(true);
        let closed = self.handle.closed.clone();
        let completed = tokio::select! {
            _ = closed.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        };
        self.set_typing(false);
        completed
    }

    /// Send the history to the chat endpoint and stream the reply into the store
    async fn run_completion(&mut self, follow_up: bool) {
        let request = ChatRequest::new(
            self.store.messages().iter().map(Message::to_wire).collect(),
            self.flow.profile().raw().clone(),
        );

        self.set_typing(true);
        match self.endpoint.stream(&request).await {
            Ok(stream) => self.consume_stream(stream, follow_up).await,
            Err(e) => self.fail(e.to_string(), e.is_transport()),
        }
        self.set_typing(false);
    }

    async fn consume_stream(&mut self, mut stream: ChatStream, follow_up: bool) {
        let closed = self.handle.closed.clone();
        let mut accumulator = DeltaAccumulator::new();
        let mut open: Option<StreamingIndex> = None;
        // Message and whether it was a transport failure
        let mut failure: Option<(String, bool)> = None;

        loop {
            let event = tokio::select! {
                _ = closed.cancelled() => {
                    tracing::debug!("Chat closed while streaming; discarding the rest of the reply");
                    return;
                }
                event = stream.next() => event,
            };

            match event {
                Some(StreamEvent::Delta { content }) if content.is_empty() => {}
                Some(StreamEvent::Delta { content }) => {
                    accumulator.push(&content);
                    if let Err(e) = self.publish(&mut open, accumulator.text()) {
                        failure = Some((e.to_string(), false));
                        break;
                    }
                }
                Some(StreamEvent::Error { message }) => {
                    failure = Some((message, true));
                    break;
                }
                Some(StreamEvent::Done) | None => break,
            }
        }

        let sealed = open.map(|stream| {
            let index = self.store.seal(stream);
            self.emit(ChatEvent::MessageSealed { index });
            index
        });

        if failure.is_none() && sealed.is_none() {
            failure = Some((htime_ai::Error::MissingBody.to_string(), true));
        }
        if let Some((message, transport)) = failure {
            self.fail(message, transport);
            return;
        }

        tracing::debug!(
            "Reply complete: {} fragments, {} chars",
            accumulator.fragments(),
            accumulator.text().len()
        );

        if !follow_up {
            return;
        }
        let Some(index) = sealed else {
            return;
        };
        let actions = self.flow.follow_up_actions(accumulator.text());
        if actions.is_empty() {
            return;
        }
        if self.store.attach_actions(index, actions.clone()).is_ok() {
            self.emit(ChatEvent::ActionsAttached { index, actions });
        }
    }

    /// Write the accumulated reply into the open message, opening it on the
    /// first fragment.
    fn publish(&mut self, open: &mut Option<StreamingIndex>, text: &str) -> crate::error::Result<()> {
        if open.is_none() {
            let stream = self.store.begin_stream()?;
            let index = stream.index();
            *open = Some(stream);
            if let Some(message) = self.store.get(index).cloned() {
                self.emit(ChatEvent::MessageAppended { index, message });
            }
        }

        if let Some(stream) = open.as_ref() {
            self.store.update_last(stream, text)?;
            self.emit(ChatEvent::MessageUpdated {
                index: stream.index(),
                content: text.to_string(),
            });
        }
        Ok(())
    }

    fn fail(&mut self, message: String, transport: bool) {
        if transport {
            tracing::warn!("Chat request failed: {}", message);
        } else {
            tracing::error!("Chat reply could not be recorded: {}", message);
        }
        self.emit(ChatEvent::Error { message, transport });
        self.append(Message::assistant(APOLOGY_MESSAGE));
    }
}
