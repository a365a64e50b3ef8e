//! Session formatting for CLI output

use hubauth_core::scope::format_scopes;
use hubauth_core::{CredentialSession, PermissionScope, SessionChangeEvent};
use tokio::sync::mpsc;

/// One-line summary of a session
pub fn format_session(session: &CredentialSession) -> String {
    format!(
        "{}  {} ({})  scope {}",
        session.id,
        session.account.label,
        session.account.id,
        format_scopes(&session.scopes)
    )
}

/// Format a list of sessions for display
pub fn format_session_list(sessions: &[CredentialSession]) -> String {
    if sessions.is_empty() {
        return "\nNo sessions.\n".to_string();
    }

    let mut sorted: Vec<&CredentialSession> = sessions.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut output = format!("\nSessions ({}):\n\n", sessions.len());
    for session in sorted {
        output.push_str(&format!("  {}\n", format_session(session)));
    }
    output
}

/// Format the permission scopes, most permissive first
pub fn format_scope_list() -> String {
    let mut output = String::from("\nScopes (most to least permissive):\n\n");
    for scope in PermissionScope::ALL {
        let name = match scope {
            PermissionScope::Empty => "\"\"".to_string(),
            other => other.to_string(),
        };
        output.push_str(&format!("  {}  {}\n", scope.rank(), name));
    }
    output
}

/// Lines describing a change event, `+` for added and `-` for removed
pub fn format_event(event: &SessionChangeEvent) -> Vec<String> {
    event
        .added()
        .iter()
        .map(|s| format!("+ added   {}", format_session(s)))
        .chain(
            event
                .removed()
                .iter()
                .map(|s| format!("- removed {}", format_session(s))),
        )
        .collect()
}

/// Prints queued change events
///
/// Events arrive on a store channel subscription and are printed when
/// [`EventPresenter::flush`] is called, so they never interleave with a
/// prompt.
pub struct EventPresenter {
    rx: mpsc::UnboundedReceiver<SessionChangeEvent>,
}

impl EventPresenter {
    pub fn new(rx: mpsc::UnboundedReceiver<SessionChangeEvent>) -> Self {
        Self { rx }
    }

    /// Drain all queued events into display lines
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            lines.extend(format_event(&event));
        }
        lines
    }

    /// Drain and print all queued events
    pub fn flush(&mut self) {
        for line in self.drain() {
            println!("  {}", line);
        }
    }
}
