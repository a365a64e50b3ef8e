//! Token acquisition.
//!
//! A [`TokenAcquirer`] performs the login request and returns the raw token
//! string exactly as the hub issued it. Timeouts and retries belong to the
//! implementation; the session store never retries.

use async_trait::async_trait;

#[cfg(feature = "hub")]
mod hub;

#[cfg(feature = "hub")]
pub use hub::HubTokenAcquirer;

/// Errors that can occur while acquiring a token.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// The hub rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The login request could not be completed.
    #[error("network error: {0}")]
    Network(String),

    /// The hub answered with something other than a token.
    #[error("{0}")]
    Other(String),
}

impl AcquireError {
    /// Returns true if the hub rejected the credentials
    pub fn is_auth_failed(&self) -> bool {
        matches!(self, Self::AuthFailed(_))
    }

    /// Returns true if this is a transport-level failure
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Logs in to the hub and returns the raw access token.
#[async_trait]
pub trait TokenAcquirer: Send + Sync {
    /// Exchange a username and secret for a raw token.
    async fn acquire(&self, username: &str, secret: &str) -> Result<String, AcquireError>;
}
