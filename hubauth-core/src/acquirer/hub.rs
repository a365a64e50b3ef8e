//! [`TokenAcquirer`] backed by the registry hub login endpoint.

use async_trait::async_trait;
use hubauth_client::{HubClient, HubError};

use super::{AcquireError, TokenAcquirer};

/// Acquires tokens with [`HubClient::login`].
///
/// # Example
///
/// ```no_run
/// use hubauth_client::HubClient;
/// use hubauth_core::{HubTokenAcquirer, SessionStore, StaticAccountChooser};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let acquirer = HubTokenAcquirer::new(HubClient::builder().build()?);
/// let chooser = StaticAccountChooser::from_env()?;
/// let store = SessionStore::new(chooser, acquirer);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HubTokenAcquirer {
    client: HubClient,
}

impl HubTokenAcquirer {
    /// Wrap an existing client.
    pub fn new(client: HubClient) -> Self {
        Self { client }
    }

    /// Build a client from the environment (see [`HubClient::from_env`]).
    pub fn from_env() -> Result<Self, HubError> {
        Ok(Self::new(HubClient::from_env()?))
    }

    /// The underlying client.
    pub fn client(&self) -> &HubClient {
        &self.client
    }
}

#[async_trait]
impl TokenAcquirer for HubTokenAcquirer {
    async fn acquire(&self, username: &str, secret: &str) -> Result<String, AcquireError> {
        let response = self.client.login(username, secret).await?;
        Ok(response.token)
    }
}

impl From<HubError> for AcquireError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::Authentication(msg) => AcquireError::AuthFailed(msg),
            HubError::Network(msg)
            | HubError::RateLimited(msg)
            | HubError::ServiceUnavailable(msg) => AcquireError::Network(msg),
            other => AcquireError::Other(other.to_string()),
        }
    }
}
