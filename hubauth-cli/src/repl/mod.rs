//! Interactive REPL for hub credential sessions

mod commands;
mod presentation;

use crate::error::CliError;
use presentation::EventPresenter;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use hubauth_core::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;

pub use commands::{handle_command, help, CommandResult, CommandType};
pub use presentation::{format_event, format_scope_list, format_session, format_session_list};

/// The input prompt string
pub fn input_prompt() -> &'static str {
    "hubauth> "
}

/// Format the welcome banner header
pub fn format_welcome_header(api_base: &str) -> String {
    format!("hubauth v{} ({})", env!("CARGO_PKG_VERSION"), api_base)
}

/// Where REPL history is kept
pub fn history_path() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("hubauth/history.txt"))
        .unwrap_or_else(|| ".hubauth/history.txt".into())
}

/// Record a line in the editor history. Failures are logged and ignored.
fn add_history(rl: &mut DefaultEditor, line: &str) {
    if let Err(e) = rl.add_history_entry(line) {
        log::debug!("could not record history entry: {}", e);
    }
}

/// Run an interactive REPL over a session store
///
/// This provides a command-line interface with:
/// - Up/down arrow history, saved between runs
/// - Ctrl+R reverse search
/// - Slash commands to sign in, list and forget sessions
/// - `+ added` / `- removed` lines whenever the session set changes
///
/// # Errors
///
/// Returns `CliError` if the line editor cannot be created. History
/// failures are logged, and failed logins are reported inline; neither
/// ends the REPL.
pub async fn run_repl(store: Arc<SessionStore>, api_base: &str) -> Result<(), CliError> {
    let (subscription, rx) = store.subscribe_channel();
    let mut presenter = EventPresenter::new(rx);

    println!("\n{}", format_welcome_header(api_base));
    println!("Type /help for commands, /login to sign in\n");

    let mut rl = DefaultEditor::new()?;

    let history_path = history_path();
    if history_path.exists() {
        rl.load_history(&history_path).ok();
    }

    loop {
        match rl.readline(input_prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                add_history(&mut rl, line);

                let result = handle_command(line, &store).await;
                presenter.flush();

                match result {
                    CommandResult::Exit => break,
                    CommandResult::Output(text) => println!("{}", text),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C - just continue
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    store.unsubscribe(subscription);

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    if let Err(e) = rl.save_history(&history_path) {
        log::warn!("could not save history to {}: {}", history_path.display(), e);
    }

    Ok(())
}
