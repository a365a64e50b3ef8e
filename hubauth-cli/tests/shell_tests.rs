use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use hubauth_cli::repl::{handle_command, CommandResult};
use hubauth_cli::{Config, PromptAccountChooser, Prompter};
use hubauth_core::test_utils::{token_json, MockTokenAcquirer};
use hubauth_core::SessionStore;

/// Answers prompts from a script.
struct Script {
    lines: Mutex<VecDeque<String>>,
}

impl Script {
    fn new(lines: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            lines: Mutex::new(lines.iter().map(|s| s.to_string()).collect()),
        })
    }
}

impl Prompter for Script {
    fn message(&self, _text: &str) {}

    fn read_line(&self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.lines.lock().unwrap().pop_front())
    }

    fn read_secret(&self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.lines.lock().unwrap().pop_front())
    }
}

fn text(result: CommandResult) -> String {
    match result {
        CommandResult::Output(text) => text,
        CommandResult::Exit => panic!("unexpected exit"),
    }
}

#[tokio::test]
async fn test_login_with_configured_accounts() {
    std::env::set_var("HUBAUTH_SHELL_TEST_BOB_PW", "bob-secret");
    let config = Config::from_json(
        r#"{
            "accounts": [
                {"username": "alice"},
                {"username": "bob", "password_env": "HUBAUTH_SHELL_TEST_BOB_PW"}
            ]
        }"#,
    )
    .unwrap();

    let chooser = PromptAccountChooser::with_prompter(config.accounts, Script::new(&["2"]))
        .with_fallback_env(None);
    let acquirer =
        MockTokenAcquirer::new().with_token(token_json("bob-1", "bob", "uid-bob", "repo:write"));
    let store = SessionStore::new(chooser, acquirer.clone());
    let (_, mut events) = store.subscribe_channel();

    let output = text(handle_command("/login repo:write", &store).await);
    assert!(output.contains("Signed in: bob-1  bob (uid-bob)"));
    assert_eq!(
        acquirer.calls(),
        vec![("bob".to_string(), "bob-secret".to_string())]
    );

    let event = events.try_recv().unwrap();
    assert_eq!(event.added()[0].id, "bob-1");

    let output = text(handle_command("/sessions", &store).await);
    assert!(output.contains("bob-1"));

    text(handle_command("/logout bob-1", &store).await);
    let event = events.try_recv().unwrap();
    assert_eq!(event.removed()[0].id, "bob-1");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_login_prompts_for_username_and_password() {
    let chooser = PromptAccountChooser::with_prompter(Vec::new(), Script::new(&["carol", "pw"]))
        .with_fallback_env(None);
    let acquirer =
        MockTokenAcquirer::new().with_token(token_json("carol-1", "carol", "uid-carol", ""));
    let store = SessionStore::new(chooser, acquirer.clone());

    let output = text(handle_command("/login repo:admin", &store).await);
    assert!(output.contains("Signed in: carol-1"));
    assert_eq!(acquirer.calls(), vec![("carol".to_string(), "pw".to_string())]);
}

#[tokio::test]
async fn test_cancelled_login_changes_nothing() {
    let chooser = PromptAccountChooser::with_prompter(Vec::new(), Script::new(&[""]))
        .with_fallback_env(None);
    let acquirer = MockTokenAcquirer::new();
    let store = SessionStore::new(chooser, acquirer.clone());
    let (_, mut events) = store.subscribe_channel();

    let output = text(handle_command("/login", &store).await);
    assert_eq!(output, "Login cancelled.");
    assert_eq!(acquirer.call_count(), 0);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_exit() {
    let chooser = PromptAccountChooser::with_prompter(Vec::new(), Script::new(&[]));
    let store = SessionStore::new(chooser, MockTokenAcquirer::new());
    assert_eq!(handle_command("/exit", &store).await, CommandResult::Exit);
}
