//! Plain-text rendering of chat events

use std::io::Write;

use htime_ai::Role;
use htime_assistant::{ChatEvent, Message, QuickAction};

/// Prints chat events as a transcript.
///
/// Streaming replies are printed incrementally; only the new suffix of each
/// update is written.
#[derive(Debug, Default)]
pub struct Renderer {
    streaming: Option<(usize, usize)>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print existing messages, e.g. the greeting
    pub fn replay(&mut self, messages: &[Message]) {
        for message in messages {
            self.print_message(message);
        }
    }

    pub fn render(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::MessageAppended { index, message } => {
                self.finish_line();
                match message.role {
                    // Echoed by the terminal already
                    Role::User => {}
                    Role::Assistant if message.content.is_empty() => {
                        print!("assistant> ");
                        self.streaming = Some((*index, 0));
                    }
                    Role::Assistant => self.print_message(message),
                }
            }
            ChatEvent::MessageUpdated { index, content } => {
                let printed = match self.streaming {
                    Some((i, printed)) if i == *index => printed,
                    _ => {
                        self.finish_line();
                        print!("assistant> ");
                        0
                    }
                };
                if let Some(suffix) = content.get(printed..) {
                    print!("{}", suffix);
                }
                let _ = std::io::stdout().flush();
                self.streaming = Some((*index, content.len()));
            }
            ChatEvent::MessageSealed { .. } => self.finish_line(),
            ChatEvent::ActionsAttached { actions, .. } => {
                self.finish_line();
                print_actions(actions);
            }
            ChatEvent::TypingChanged { .. } => {}
            ChatEvent::MeetingScheduled { meeting } => {
                self.finish_line();
                println!("[Meeting scheduled: {} - {}]", meeting.time, meeting.details);
            }
            ChatEvent::OpenUrl { url } => {
                self.finish_line();
                println!("[Open {}]", url);
            }
            ChatEvent::Error { message, .. } => {
                self.finish_line();
                tracing::warn!("Chat error: {}", message);
            }
        }
    }

    /// Terminate a partially printed reply
    pub fn finish_line(&mut self) {
        if self.streaming.take().is_some() {
            println!();
        }
    }

    fn print_message(&mut self, message: &Message) {
        if message.role == Role::User {
            println!("you> {}", message.content);
            return;
        }
        println!("assistant> {}", message.content);
        print_actions(&message.actions);
    }
}

fn print_actions(actions: &[QuickAction]) {
    for (i, action) in actions.iter().enumerate() {
        println!("  [/{}] {}", i + 1, action.label);
    }
}
