//! Configuration file for the `hubauth` shell.
//!
//! ```json
//! {
//!   "api_base": "https://hub.docker.com",
//!   "accounts": [
//!     { "username": "alice", "password_env": "ALICE_HUB_TOKEN" },
//!     { "username": "${CI_HUB_USER:-ci-bot}" }
//!   ]
//! }
//! ```
//!
//! String values may reference environment variables with `${VAR}` or
//! `${VAR:-default}`. They are expanded after parsing, so substituted values
//! need no JSON escaping. A missing file is the same as an empty one, and a
//! leading `~` in the file path is expanded to the home directory.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Hub API base URL (defaults to the public hub)
    #[serde(default)]
    pub api_base: Option<String>,

    /// Accounts offered when signing in
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
}

/// A configured account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountEntry {
    /// Hub username
    pub username: String,

    /// Environment variable holding this account's password or access token
    #[serde(default)]
    pub password_env: Option<String>,
}

impl Config {
    /// Load configuration from `path`
    ///
    /// Returns the default configuration if the file does not exist.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        let path = Path::new(expanded.as_ref());

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from JSON text, expanding environment variables
    /// in the string values
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_json::from_str(content)?;
        config.expand_env();
        Ok(config)
    }

    fn expand_env(&mut self) {
        if let Some(api_base) = self.api_base.as_mut() {
            *api_base = expand_env_vars(api_base);
        }
        for account in &mut self.accounts {
            account.username = expand_env_vars(&account.username);
            if let Some(var) = account.password_env.as_mut() {
                *var = expand_env_vars(var);
            }
        }
    }

    /// Look up a configured account by username
    pub fn account(&self, username: &str) -> Option<&AccountEntry> {
        self.accounts.iter().find(|a| a.username == username)
    }
}

/// Default configuration path: `<config dir>/hubauth/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("hubauth").join("config.json"))
        .unwrap_or_else(|| PathBuf::from(".hubauth/config.json"))
}

/// Expand `${VAR}` and `${VAR:-default}` references
///
/// Unset variables without a default expand to the empty string.
pub fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next(); // '{'

        let mut var_name = String::new();
        let mut default_value: Option<String> = None;

        while let Some(next_ch) = chars.next() {
            match next_ch {
                '}' => break,
                ':' if chars.peek() == Some(&'-') => {
                    chars.next(); // '-'
                    let mut value = String::new();
                    for default_ch in chars.by_ref() {
                        if default_ch == '}' {
                            break;
                        }
                        value.push(default_ch);
                    }
                    default_value = Some(value);
                    break;
                }
                _ => var_name.push(next_ch),
            }
        }

        match std::env::var(&var_name) {
            Ok(value) => result.push_str(&value),
            Err(_) => result.push_str(default_value.as_deref().unwrap_or("")),
        }
    }

    result
}
