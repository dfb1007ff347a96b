//! Slash commands for interactive mode

use chrono::Local;
use cirrus_api::{EntryKind, Role};
use cirrus_session::StreamReducer;
use std::path::PathBuf;

use crate::ui;
use crate::utils::truncate_chars;

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to the backend)
    Message(String),
    /// Attach files to the conversation
    Attach(Vec<PathBuf>),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, state: &StreamReducer) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next().unwrap_or("").to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "agents" | "a" => CommandResult::Message(ui::agents_table(state.agents().iter())),

        "architecture" | "arch" => CommandResult::Message(match state.architecture() {
            Some(snapshot) => ui::architecture_summary(snapshot),
            None => "No architecture yet.".to_string(),
        }),

        "deployment" | "deploy" => CommandResult::Message(match state.deployment() {
            Some(snapshot) => ui::deployment_line(snapshot),
            None => "No deployment yet.".to_string(),
        }),

        "history" => CommandResult::Message(history(state)),

        "attach" => {
            let paths: Vec<PathBuf> = args.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                CommandResult::Message("Usage: /attach <path>...".to_string())
            } else {
                CommandResult::Attach(paths)
            }
        }

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn history(state: &StreamReducer) -> String {
    let entries = state.transcript().entries();
    if entries.is_empty() {
        return "No messages yet.".to_string();
    }

    entries
        .iter()
        .map(|entry| {
            let who = match (entry.role, entry.kind) {
                (_, EntryKind::Error) => "error".to_string(),
                (Role::User, _) => "you".to_string(),
                (Role::Assistant, _) => entry
                    .source_agent
                    .clone()
                    .unwrap_or_else(|| "assistant".to_string()),
            };
            format!(
                "{} {}: {}",
                entry.created_at.with_timezone(&Local).format("%H:%M:%S"),
                who,
                truncate_chars(&entry.content.replace('\n', " "), 80)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /agents, /a            Show agent status and metrics
  /architecture, /arch   Show the current architecture
  /deployment, /deploy   Show deployment progress
  /history               List the conversation so far
  /attach <path>...      Attach files to the conversation
  /quit, /exit, /q       Exit cirrus

Anything else is sent to the agents. Ctrl-C stops a reply in progress."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_session::AgentRegistry;

    fn state() -> StreamReducer {
        StreamReducer::new(AgentRegistry::default_fleet())
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert!(execute_command("deploy my app", &state()).is_none());
    }

    #[test]
    fn test_exit_aliases() {
        for input in ["/quit", "/exit", "/q", "  /Q  "] {
            assert_eq!(execute_command(input, &state()), Some(CommandResult::Exit));
        }
    }

    #[test]
    fn test_attach_paths() {
        assert_eq!(
            execute_command("/attach main.tf  app.yaml", &state()),
            Some(CommandResult::Attach(vec![
                PathBuf::from("main.tf"),
                PathBuf::from("app.yaml")
            ]))
        );
        assert!(matches!(
            execute_command("/attach", &state()),
            Some(CommandResult::Message(_))
        ));
    }

    #[test]
    fn test_agents_lists_fleet() {
        let Some(CommandResult::Message(text)) = execute_command("/agents", &state()) else {
            panic!("expected message");
        };
        assert!(text.contains("Requirements Analysis Agent: idle"));
        assert!(text.contains("Deployment Agent: idle"));
    }

    #[test]
    fn test_history() {
        let mut s = state();
        assert_eq!(
            execute_command("/history", &s),
            Some(CommandResult::Message("No messages yet.".into()))
        );

        s.push_user("hello");
        s.on_text("hi there", Some("cloud-architecture"));
        let Some(CommandResult::Message(text)) = execute_command("/history", &s) else {
            panic!("expected message");
        };
        assert!(text.contains("you: hello"));
        assert!(text.contains("cloud-architecture: hi there"));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(
            execute_command("/bogus", &state()),
            Some(CommandResult::Unknown("bogus".into()))
        );
    }
}
