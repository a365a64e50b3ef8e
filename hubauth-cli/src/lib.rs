//! Interactive sign-in shell for registry hub credential sessions
//!
//! This crate provides:
//! - A JSON configuration file listing accounts
//! - An account chooser that prompts on the terminal
//! - A REPL for signing in, listing and forgetting sessions

pub mod chooser;
pub mod config;
mod error;
pub mod repl;

pub use chooser::{PromptAccountChooser, Prompter, TerminalPrompter};
pub use config::{default_config_path, AccountEntry, Config, ConfigError};
pub use error::CliError;
pub use repl::run_repl;
