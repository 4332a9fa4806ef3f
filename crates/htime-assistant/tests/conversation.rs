//! End-to-end conversations against a scripted event-stream endpoint

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use htime_ai::{ChatEndpoint, ChatRequest, ChatStream, Role, StreamEvent, decode_stream};
use htime_assistant::{
    APOLOGY_MESSAGE, ActionKind, ChatEvent, ChatSession, Dispatch, FlowPhase, MeetingRequest,
    ProfileConfig, QuickAction, SeededRandom, SessionOptions,
};
use parking_lot::Mutex;
use serde_json::json;

/// A scripted reply: raw body bytes cut into chunks, or a request failure
enum Reply {
    Body(Vec<Vec<u8>>),
    Fail(fn() -> htime_ai::Error),
}

/// Serves raw event-stream bodies through the real decoder
struct SseEndpoint {
    replies: Mutex<Vec<Reply>>,
    calls: AtomicUsize,
}

impl SseEndpoint {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatEndpoint for SseEndpoint {
    async fn stream(&self, _request: &ChatRequest) -> htime_ai::Result<ChatStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut replies = self.replies.lock();
            if replies.is_empty() {
                Reply::Body(vec![sse_body(&["ok"])])
            } else {
                replies.remove(0)
            }
        };
        match next {
            Reply::Body(chunks) => Ok(decode_stream(futures::stream::iter(
                chunks.into_iter().map(Ok::<_, std::io::Error>),
            ))),
            Reply::Fail(make) => Err(make()),
        }
    }
}

/// Sends one fragment, stalls, then finishes the reply
struct StallingEndpoint {
    stall: Duration,
}

#[async_trait]
impl ChatEndpoint for StallingEndpoint {
    async fn stream(&self, _request: &ChatRequest) -> htime_ai::Result<ChatStream> {
        let stall = self.stall;
        Ok(Box::pin(stream! {
            yield StreamEvent::Delta { content: "Par".to_string() };
            tokio::time::sleep(stall).await;
            yield StreamEvent::Delta { content: "tial".to_string() };
            yield StreamEvent::Done;
        }))
    }
}

fn sse_body(fragments: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for fragment in fragments {
        let chunk = json!({"choices": [{"delta": {"content": fragment}}]});
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

fn chunked(body: &[u8], size: usize) -> Vec<Vec<u8>> {
    body.chunks(size).map(<[u8]>::to_vec).collect()
}

fn session(config: serde_json::Value, endpoint: Arc<SseEndpoint>) -> ChatSession {
    ChatSession::with_options(
        "Ava",
        ProfileConfig::new(config),
        endpoint,
        SessionOptions {
            purpose_prompt_delay: Duration::ZERO,
            ..Default::default()
        },
        Box::new(SeededRandom::seeded(2024)),
    )
}

fn last_content(chat: &ChatSession) -> &str {
    chat.messages()
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_reply_is_independent_of_chunking() {
    let fragments = ["Ca", "fé ☕ at ", "2:00 PM", " works", "."];
    let body = sse_body(&fragments);

    for size in [1, 2, 3, 7, 16, body.len()] {
        let endpoint = SseEndpoint::new(vec![Reply::Body(chunked(&body, size))]);
        let mut chat = session(json!({}), endpoint);
        chat.send_text("hello").await;

        assert_eq!(last_content(&chat), "Café ☕ at 2:00 PM works.", "chunk size {}", size);
        assert_eq!(chat.messages().len(), 3);
    }
}

#[tokio::test]
async fn test_split_line_is_joined() {
    let endpoint = SseEndpoint::new(vec![Reply::Body(vec![
        b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel".to_vec(),
        b"lo\"}}]}\n\ndata: [DONE]\n\n".to_vec(),
    ])]);
    let mut chat = session(json!({}), endpoint);
    let mut rx = chat.subscribe();

    chat.send_text("hi").await;
    assert_eq!(last_content(&chat), "Hello");

    let mut updates = 0;
    while let Ok(event) = rx.try_recv() {
        if let ChatEvent::MessageUpdated { content, .. } = event {
            assert_eq!(content, "Hello");
            updates += 1;
        }
    }
    assert_eq!(updates, 1);
}

#[tokio::test]
async fn test_missing_body_yields_one_apology() {
    let endpoint = SseEndpoint::new(vec![Reply::Fail(|| htime_ai::Error::MissingBody)]);
    let mut chat = session(json!({}), endpoint);

    chat.send_text("hi").await;
    let messages = chat.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[2].content, APOLOGY_MESSAGE);
    assert_eq!(
        messages.iter().filter(|m| m.content == APOLOGY_MESSAGE).count(),
        1
    );
    assert!(!chat.is_typing());
}

#[tokio::test]
async fn test_empty_body_yields_one_apology() {
    let endpoint = SseEndpoint::new(vec![
        Reply::Body(vec![]),
        Reply::Body(vec![b"data: [DONE]\n\n".to_vec()]),
    ]);
    let mut chat = session(json!({"enable_interactive_buttons": true}), endpoint);
    let mut rx = chat.subscribe();

    chat.send_text("hi").await;
    assert_eq!(chat.messages().len(), 3);
    assert_eq!(last_content(&chat), APOLOGY_MESSAGE);

    chat.send_text("again").await;
    assert_eq!(chat.messages().len(), 5);
    assert_eq!(last_content(&chat), APOLOGY_MESSAGE);

    assert!(chat.messages().iter().all(|m| !m.content.is_empty()));
    assert!(chat.messages().iter().all(|m| m.actions.is_empty()));
    assert!(!chat.is_typing());

    let errors: Vec<bool> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            ChatEvent::Error { transport, .. } => Some(transport),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec![true, true]);
}

#[tokio::test]
async fn test_api_error_then_recovery() {
    let endpoint = SseEndpoint::new(vec![
        Reply::Fail(|| htime_ai::Error::api(500, "boom")),
        Reply::Body(vec![sse_body(&["Back ", "online"])]),
    ]);
    let mut chat = session(json!({}), endpoint.clone());

    chat.send_text("first").await;
    assert_eq!(last_content(&chat), APOLOGY_MESSAGE);

    assert_eq!(chat.send_text("second").await, Dispatch::Handled);
    assert_eq!(last_content(&chat), "Back online");
    assert_eq!(endpoint.calls(), 2);
}

#[tokio::test]
async fn test_duplicate_slot_is_ignored() {
    let endpoint = SseEndpoint::new(vec![]);
    let mut chat = session(json!({}), endpoint.clone());

    assert_eq!(chat.time_slot_selected("2:00 PM").await, Dispatch::Handled);
    assert_eq!(chat.time_slot_selected("2:00 PM").await, Dispatch::Ignored);

    let requests: Vec<_> = chat
        .messages()
        .iter()
        .filter(|m| m.content == "I'd like to schedule a meeting for 2:00 PM.")
        .collect();
    assert_eq!(requests.len(), 1);
    assert_eq!(chat.phase(), FlowPhase::AwaitingPurpose);
    assert_eq!(endpoint.calls(), 0);
}

#[tokio::test]
async fn test_purpose_after_slot_schedules_once() {
    let endpoint = SseEndpoint::new(vec![]);
    let mut chat = session(json!({"enable_meeting_reminders": true}), endpoint.clone());

    let scheduled: Arc<Mutex<Vec<MeetingRequest>>> = Arc::default();
    let sink = scheduled.clone();
    chat.set_on_schedule(move |meeting| sink.lock().push(meeting.clone()));

    chat.time_slot_selected("2:00 PM").await;
    assert!(
        last_content(&chat).contains("What would you like to discuss"),
        "purpose prompt expected, got {:?}",
        last_content(&chat)
    );

    chat.send_text("Quarterly review").await;

    let scheduled = scheduled.lock();
    assert_eq!(
        *scheduled,
        vec![MeetingRequest {
            time: "2:00 PM".to_string(),
            details: "Quarterly review".to_string(),
        }]
    );

    let confirmation = chat.messages().last().unwrap();
    assert!(confirmation.content.contains("2:00 PM"));
    assert!(confirmation.content.contains("Quarterly review"));
    let kinds: Vec<_> = confirmation.actions.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ActionKind::Signup, ActionKind::SetReminder]);
    assert_eq!(endpoint.calls(), 0);
    assert_eq!(chat.phase(), FlowPhase::Scheduled);
}

#[tokio::test]
async fn test_reminder_code_is_repeated_on_close() {
    let mut chat = session(json!({}), SseEndpoint::new(vec![]));
    chat.time_slot_selected("10:00 AM").await;
    chat.send_text("Intro call").await;

    chat.trigger(&QuickAction::new("Set reminder", ActionKind::SetReminder))
        .await;
    let code = chat
        .context()
        .reference_code
        .clone()
        .expect("reference code after reminder");
    assert!(last_content(&chat).contains(&code));
    assert_eq!(chat.phase(), FlowPhase::PostScheduleOffer);

    chat.trigger(&QuickAction::new("Continue chatting", ActionKind::ContinueChat))
        .await;
    chat.trigger(&QuickAction::new("Close conversation", ActionKind::CloseConversation))
        .await;
    assert!(last_content(&chat).contains(&code));
    assert_eq!(chat.phase(), FlowPhase::Idle);
    assert!(chat.context().reference_code.is_none());
}

#[tokio::test]
async fn test_no_buttons_without_interactive_flag() {
    let endpoint = SseEndpoint::new(vec![Reply::Body(vec![sse_body(&[
        "Let's set up a meeting about: onboarding.",
    ])])]);
    let mut chat = session(json!({}), endpoint);

    chat.handle_action("schedule", None).await;
    let last = chat.messages().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(last.actions.is_empty());
}

#[tokio::test]
async fn test_meeting_about_reply_offers_confirmation() {
    let endpoint = SseEndpoint::new(vec![Reply::Body(vec![sse_body(&[
        "Booked 9:00 AM. A meeting about ",
        "Budget planning. Shall I confirm?",
    ])])]);
    let mut chat = session(json!({"enable_interactive_buttons": true}), endpoint);

    let payload = json!({"time": "9:00 AM"}).as_object().cloned();
    chat.handle_action("select-time", payload).await;

    let last = chat.messages().last().unwrap();
    assert_eq!(last.actions.len(), 2);
    let confirm = &last.actions[0];
    assert_eq!(confirm.kind, ActionKind::ConfirmMeeting);
    assert_eq!(confirm.payload_str("time"), Some("9:00 AM"));
    assert_eq!(confirm.payload_str("details"), Some("Budget planning"));

    let confirm = confirm.clone();
    chat.trigger(&confirm).await;
    assert!(last_content(&chat).starts_with("Perfect! Your meeting is scheduled for 9:00 AM."));
}

#[tokio::test]
async fn test_closed_widget_stops_writing() {
    let endpoint = SseEndpoint::new(vec![]);
    let mut chat = session(json!({}), endpoint.clone());
    let handle = chat.handle();
    let before = chat.messages().len();

    handle.close();
    assert_eq!(chat.send_text("anyone there?").await, Dispatch::Ignored);
    assert_eq!(chat.messages().len(), before);
    assert_eq!(endpoint.calls(), 0);
}

#[tokio::test]
async fn test_typing_is_cleared_after_reply() {
    let endpoint = SseEndpoint::new(vec![Reply::Body(vec![sse_body(&["Sure"])])]);
    let mut chat = session(json!({}), endpoint);
    let mut rx = chat.subscribe();

    chat.send_text("hi").await;
    assert!(!chat.is_typing());

    let typing: Vec<bool> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            ChatEvent::TypingChanged { is_typing } => Some(is_typing),
            _ => None,
        })
        .collect();
    assert_eq!(typing, vec![true, false]);
}

#[tokio::test]
async fn test_close_mid_stream_keeps_partial_reply() {
    let endpoint = Arc::new(StallingEndpoint {
        stall: Duration::from_millis(200),
    });
    let mut chat = ChatSession::with_options(
        "Ava",
        ProfileConfig::new(json!({})),
        endpoint,
        SessionOptions::default(),
        Box::new(SeededRandom::seeded(2024)),
    );
    let handle = chat.handle();
    let closer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close();
    });

    assert_eq!(chat.send_text("hi").await, Dispatch::Handled);
    closer.await.unwrap();

    assert_eq!(last_content(&chat), "Par");
    assert_eq!(chat.messages().len(), 3);
    assert!(chat.messages().iter().all(|m| m.content != APOLOGY_MESSAGE));
    assert!(!chat.is_typing());
    assert_eq!(chat.send_text("still there?").await, Dispatch::Ignored);
}

#[tokio::test]
async fn test_close_during_purpose_delay_drops_prompt() {
    let endpoint = SseEndpoint::new(vec![]);
    let mut chat = ChatSession::with_options(
        "Ava",
        ProfileConfig::new(json!({})),
        endpoint.clone(),
        SessionOptions {
            purpose_prompt_delay: Duration::from_millis(500),
            ..Default::default()
        },
        Box::new(SeededRandom::seeded(2024)),
    );
    let mut rx = chat.subscribe();
    let handle = chat.handle();
    let closer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.close();
    });

    assert_eq!(chat.time_slot_selected("2:00 PM").await, Dispatch::Handled);
    closer.await.unwrap();

    assert_eq!(last_content(&chat), "I'd like to schedule a meeting for 2:00 PM.");
    assert_eq!(chat.messages().last().unwrap().role, Role::User);
    assert!(!chat.is_typing());
    assert_eq!(endpoint.calls(), 0);

    let typing: Vec<bool> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            ChatEvent::TypingChanged { is_typing } => Some(is_typing),
            _ => None,
        })
        .collect();
    assert_eq!(typing, vec![true, false]);
}
