//! Interactive account selection.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use async_trait::async_trait;
use hubauth_core::account::PASSWORD_ENV;
use hubauth_core::{AccountChooser, AccountError, Identity};

use crate::config::AccountEntry;

/// Source of user input
///
/// Both methods return `Ok(None)` at end of input.
pub trait Prompter: Send + Sync {
    /// Show a line of text
    fn message(&self, text: &str);

    /// Read a line of text
    fn read_line(&self, prompt: &str) -> io::Result<Option<String>>;

    /// Read a secret without echoing it
    fn read_secret(&self, prompt: &str) -> io::Result<Option<String>>;
}

/// Prompter reading from the terminal
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn message(&self, text: &str) {
        println!("{}", text);
    }

    fn read_line(&self, prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn read_secret(&self, prompt: &str) -> io::Result<Option<String>> {
        dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

/// Chooses among configured accounts, prompting when needed
///
/// - No accounts configured: asks for a username.
/// - One account: uses it without asking.
/// - Several: shows a numbered list.
///
/// Empty input or end of input cancels. The secret comes from the
/// account's `password_env` variable, then `HUBAUTH_PASSWORD`, then a
/// hidden prompt.
pub struct PromptAccountChooser {
    accounts: Vec<AccountEntry>,
    preferred: Option<String>,
    fallback_env: Option<String>,
    prompter: Arc<dyn Prompter>,
}

impl PromptAccountChooser {
    /// Create a chooser over `accounts` that prompts on the terminal
    pub fn new(accounts: Vec<AccountEntry>) -> Self {
        Self::with_prompter(accounts, Arc::new(TerminalPrompter))
    }

    /// Create a chooser with a custom prompter
    pub fn with_prompter(accounts: Vec<AccountEntry>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            accounts,
            preferred: None,
            fallback_env: Some(PASSWORD_ENV.to_string()),
            prompter,
        }
    }

    /// Always sign in as `username` without asking
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.preferred = Some(username.into());
        self
    }

    /// Change (or with `None`, disable) the environment variable consulted
    /// when an account has no `password_env` of its own
    pub fn with_fallback_env(mut self, var: Option<String>) -> Self {
        self.fallback_env = var;
        self
    }

    async fn ask<T, F>(&self, f: F) -> Result<T, AccountError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Prompter) -> io::Result<T> + Send + 'static,
    {
        let prompter = Arc::clone(&self.prompter);
        tokio::task::spawn_blocking(move || f(prompter.as_ref()))
            .await
            .map_err(|e| AccountError::Io(io::Error::new(io::ErrorKind::Other, e)))?
            .map_err(AccountError::from)
    }

    fn pick_from_list(prompter: &dyn Prompter, usernames: &[String]) -> io::Result<Option<usize>> {
        prompter.message("Choose an account:");
        for (i, name) in usernames.iter().enumerate() {
            prompter.message(&format!("  {}) {}", i + 1, name));
        }

        loop {
            let input = match prompter.read_line("Account: ")? {
                Some(input) if !input.trim().is_empty() => input,
                _ => return Ok(None),
            };
            let input = input.trim();

            if let Ok(n) = input.parse::<usize>() {
                if (1..=usernames.len()).contains(&n) {
                    return Ok(Some(n - 1));
                }
            } else if let Some(i) = usernames.iter().position(|u| u == input) {
                return Ok(Some(i));
            }
            prompter.message(&format!(
                "Invalid choice. Enter a number from 1 to {}.",
                usernames.len()
            ));
        }
    }
}

#[async_trait]
impl AccountChooser for PromptAccountChooser {
    async fn choose(&self) -> Result<Identity, AccountError> {
        if let Some(username) = &self.preferred {
            return Ok(Identity::new(username.clone()));
        }

        match self.accounts.as_slice() {
            [] => {
                let username = self
                    .ask(|p| p.read_line("Hub username: "))
                    .await?
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .ok_or(AccountError::Cancelled)?;
                Ok(Identity::new(username))
            }
            [only] => Ok(Identity::new(only.username.clone())),
            many => {
                let usernames: Vec<String> = many.iter().map(|a| a.username.clone()).collect();
                let names = usernames.clone();
                let index = self
                    .ask(move |p| Self::pick_from_list(p, &names))
                    .await?
                    .ok_or(AccountError::Cancelled)?;
                Ok(Identity::new(usernames[index].clone()))
            }
        }
    }

    async fn secret(&self, identity: &Identity) -> Result<String, AccountError> {
        let account_env = self
            .accounts
            .iter()
            .find(|a| a.username == identity.username)
            .and_then(|a| a.password_env.clone());

        for var in account_env.iter().chain(self.fallback_env.iter()) {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    log::debug!("using secret from ${} for '{}'", var, identity.username);
                    return Ok(value);
                }
            }
        }

        let prompt = format!("Password or access token for {}", identity.username);
        match self.ask(move |p| p.read_secret(&prompt)).await? {
            None => Err(AccountError::Cancelled),
            Some(secret) if secret.is_empty() => {
                Err(AccountError::SecretUnavailable(identity.username.clone()))
            }
            Some(secret) => Ok(secret),
        }
    }
}
