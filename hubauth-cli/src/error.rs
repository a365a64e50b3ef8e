//! CLI-specific error types

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    /// Session store error
    #[error("Auth error: {0}")]
    Auth(#[from] hubauth_core::AuthError),

    /// Hub client construction error
    #[error("Hub error: {0}")]
    Hub(#[from] hubauth_client::HubError),

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Readline/input error
    #[error("Input error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// IO error (filesystem, stdout, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
