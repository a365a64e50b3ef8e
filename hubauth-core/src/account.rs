//! Account selection.
//!
//! Before logging in, the store asks an [`AccountChooser`] which identity to
//! authenticate as and for that identity's stored secret. Hosts provide the
//! implementation: a prompt, a config file, a keychain.

use async_trait::async_trait;

/// Environment variable read by [`StaticAccountChooser::from_env`] for the username.
pub const USERNAME_ENV: &str = "HUBAUTH_USERNAME";

/// Environment variable read by [`StaticAccountChooser::from_env`] for the secret.
pub const PASSWORD_ENV: &str = "HUBAUTH_PASSWORD";

/// Errors that can occur while choosing an account.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// The user backed out of the selection.
    #[error("cancelled")]
    Cancelled,

    /// No account is configured or available.
    #[error("no account found")]
    NoAccountFound,

    /// The account exists but its secret could not be retrieved.
    #[error("secret unavailable for '{0}'")]
    SecretUnavailable(String),

    /// IO error while prompting or reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An identity that can be authenticated against the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Hub username used for login.
    pub username: String,
}

impl Identity {
    /// Create an identity for a username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Selects the identity to authenticate and retrieves its secret.
#[async_trait]
pub trait AccountChooser: Send + Sync {
    /// Pick an identity. Returns [`AccountError::Cancelled`] when the user
    /// declines to choose.
    async fn choose(&self) -> Result<Identity, AccountError>;

    /// Retrieve the stored secret (password or personal access token) for
    /// an identity previously returned by [`Self::choose`].
    async fn secret(&self, identity: &Identity) -> Result<String, AccountError>;
}

/// Account chooser with a single fixed identity.
///
/// Useful for scripts and CI where the credentials come from the
/// environment rather than a prompt.
pub struct StaticAccountChooser {
    identity: Identity,
    secret: String,
}

impl StaticAccountChooser {
    /// Create a chooser that always returns `username` with `secret`.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: Identity::new(username),
            secret: secret.into(),
        }
    }

    /// Create a chooser from `HUBAUTH_USERNAME` and `HUBAUTH_PASSWORD`.
    pub fn from_env() -> Result<Self, AccountError> {
        let username = std::env::var(USERNAME_ENV).map_err(|_| AccountError::NoAccountFound)?;
        let secret = std::env::var(PASSWORD_ENV)
            .map_err(|_| AccountError::SecretUnavailable(username.clone()))?;
        Ok(Self::new(username, secret))
    }
}

impl std::fmt::Debug for StaticAccountChooser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAccountChooser")
            .field("identity", &self.identity)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl AccountChooser for StaticAccountChooser {
    async fn choose(&self) -> Result<Identity, AccountError> {
        Ok(self.identity.clone())
    }

    async fn secret(&self, identity: &Identity) -> Result<String, AccountError> {
        if identity == &self.identity {
            Ok(self.secret.clone())
        } else {
            Err(AccountError::SecretUnavailable(identity.username.clone()))
        }
    }
}
