//! Slash commands for interactive mode

/// Result of parsing a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Deliver a time slot as if picked in the calendar
    Slot(String),
    /// Trigger an action by tag, with an optional JSON payload
    Action {
        kind: String,
        payload: Option<String>,
    },
    /// Click the n-th quick action (1-based) on the latest message
    Click(usize),
    /// Start over with a fresh greeting
    Reset,
    /// Show a message to the user (not sent to the assistant)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command; `None` if `input` is plain text
pub fn parse_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    if let Ok(n) = command.parse::<usize>() {
        return Some(if n == 0 {
            CommandResult::Message("Actions are numbered from 1.".to_string())
        } else {
            CommandResult::Click(n)
        });
    }

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "slot" => {
            if args.is_empty() {
                CommandResult::Message("Usage: /slot <time>".to_string())
            } else {
                CommandResult::Slot(args.to_string())
            }
        }

        "action" | "a" => {
            let mut split = args.splitn(2, ' ');
            match split.next().filter(|k| !k.is_empty()) {
                Some(kind) => CommandResult::Action {
                    kind: kind.to_string(),
                    payload: split.next().map(|p| p.trim().to_string()),
                },
                None => CommandResult::Message("Usage: /action <kind> [json]".to_string()),
            }
        }

        "reset" | "r" => CommandResult::Reset,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?              Show this help message
  /slot <time>               Pick a time slot, e.g. /slot 2:00 PM
  /action, /a <kind> [json]  Trigger an action, e.g. /a confirm-meeting {"time":"9:00 AM"}
  /<n>                       Click the n-th button under the last message
  /reset, /r                 Start the conversation over
  /quit, /exit, /q           Exit"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse_command("hello"), None);
    }

    #[test]
    fn test_slot() {
        assert_eq!(
            parse_command("/slot 2:00 PM"),
            Some(CommandResult::Slot("2:00 PM".to_string()))
        );
        assert!(matches!(
            parse_command("/slot"),
            Some(CommandResult::Message(_))
        ));
    }

    #[test]
    fn test_action_with_payload() {
        assert_eq!(
            parse_command(r#"/a confirm-meeting {"time": "9:00 AM"}"#),
            Some(CommandResult::Action {
                kind: "confirm-meeting".to_string(),
                payload: Some(r#"{"time": "9:00 AM"}"#.to_string()),
            })
        );
        assert_eq!(
            parse_command("/action set-reminder"),
            Some(CommandResult::Action {
                kind: "set-reminder".to_string(),
                payload: None,
            })
        );
    }

    #[test]
    fn test_click_and_misc() {
        assert_eq!(parse_command("/2"), Some(CommandResult::Click(2)));
        assert!(matches!(parse_command("/0"), Some(CommandResult::Message(_))));
        assert_eq!(parse_command("/Q"), Some(CommandResult::Exit));
        assert_eq!(
            parse_command("/bogus"),
            Some(CommandResult::Unknown("bogus".to_string()))
        );
    }
}
