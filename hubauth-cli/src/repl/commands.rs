use hubauth_core::{AuthError, SessionStore};

use super::presentation::{format_scope_list, format_session, format_session_list};

/// Classify an input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandType<'a> {
    /// Slash command with name and arguments
    Slash {
        command: &'a str,
        args: Vec<&'a str>,
    },
    /// Anything else
    Text(&'a str),
}

impl<'a> CommandType<'a> {
    /// Parse an input line into a command type
    pub fn parse(input: &'a str) -> Self {
        if input.starts_with('/') {
            let parts: Vec<&str> = input.split_whitespace().collect();
            if !parts.is_empty() {
                return Self::Slash {
                    command: parts[0],
                    args: parts[1..].to_vec(),
                };
            }
        }

        Self::Text(input)
    }
}

/// What the REPL should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Leave the REPL
    Exit,
    /// Print this text and keep going
    Output(String),
}

/// Run one line of input against the store
///
/// Store failures are reported as output, never as errors: a failed login
/// leaves the shell running.
pub async fn handle_command(input: &str, store: &SessionStore) -> CommandResult {
    match CommandType::parse(input) {
        CommandType::Slash { command, args } => {
            let args = args.as_slice();
            match command {
                "/exit" | "/quit" => CommandResult::Exit,
                "/help" => CommandResult::Output(help::full_text()),
                "/login" => CommandResult::Output(login(store, args).await),
                "/sessions" => CommandResult::Output(list_sessions(store, args)),
                "/logout" => CommandResult::Output(logout(store, args)),
                "/scopes" => CommandResult::Output(format_scope_list()),
                _ => CommandResult::Output(format!(
                    "Unknown command: {}. Type /help for available commands.",
                    command
                )),
            }
        }
        CommandType::Text(_) => {
            CommandResult::Output("Commands start with '/'. Type /help for a list.".to_string())
        }
    }
}

async fn login(store: &SessionStore, scopes: &[&str]) -> String {
    match store.create_session(scopes).await {
        Ok(session) => format!("\nSigned in: {}\n", format_session(&session)),
        Err(AuthError::Cancelled) => "Login cancelled.".to_string(),
        Err(e) => format_error(&e),
    }
}

fn list_sessions(store: &SessionStore, scopes: &[&str]) -> String {
    match store.get_sessions(scopes) {
        Ok(sessions) => format_session_list(&sessions),
        Err(e) => format_error(&e),
    }
}

fn logout(store: &SessionStore, args: &[&str]) -> String {
    let Some(id) = args.first() else {
        return "Usage: /logout <session-id>".to_string();
    };

    if store.remove_session(id) {
        format!("Signed out of session {}.", id)
    } else {
        format!("No session with id {}.", id)
    }
}

fn format_error(err: &AuthError) -> String {
    let mut message = format!("Error: {}", err);
    if err.is_retryable() {
        message.push_str(" (try again)");
    } else if err.is_invalid_scope() {
        message.push_str(". Type /scopes for valid values.");
    }
    message
}

/// Help text sections for the CLI
pub mod help {
    /// Header for the help display
    pub const HEADER: &str = "\nAvailable Commands:\n";

    /// Session commands section
    pub const SESSIONS: &str = "\
Sessions:
  /login [scope...]     Sign in with a token granting at least these scopes
  /sessions [scope...]  List sessions (only those granting the scopes, if given)
  /logout <session-id>  Forget a session
  /scopes               List valid scopes, most permissive first
";

    /// General commands section
    pub const GENERAL: &str = "\
General:
  /help                 Show this help message
  /exit, /quit          Exit
";

    /// Keyboard shortcuts section
    pub const KEYBOARD: &str = "\
Keyboard Shortcuts:
  Up/Down               Navigate command history
  Ctrl+R                Reverse search history
  Ctrl+C                Clear the current line
  Ctrl+D                Exit
";

    /// Get the complete help text
    pub fn full_text() -> String {
        format!("{}{}\n{}\n{}", HEADER, SESSIONS, GENERAL, KEYBOARD)
    }
}
