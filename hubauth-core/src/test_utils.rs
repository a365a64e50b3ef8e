//! Test utilities for hubauth-core.
//!
//! Mock collaborators for exercising a [`crate::SessionStore`] without a
//! terminal or a network connection.
//!
//! Enable with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! hubauth-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! use hubauth_core::SessionStore;
//! use hubauth_core::test_utils::{token_json, MockAccountChooser, MockTokenAcquirer};
//!
//! # tokio_test::block_on(async {
//! let acquirer = MockTokenAcquirer::new()
//!     .with_token(token_json("s1", "alice", "u1", "repo:write"));
//! let store = SessionStore::new(MockAccountChooser::new("alice", "pw"), acquirer);
//!
//! let session = store.create_session(&["repo:read"]).await.unwrap();
//! assert_eq!(session.id, "s1");
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::account::{AccountChooser, AccountError, Identity};
use crate::acquirer::{AcquireError, TokenAcquirer};

/// Build a bare JSON token with the given claims.
pub fn token_json(session_id: &str, username: &str, user_id: &str, scope: &str) -> String {
    serde_json::json!({
        "session_id": session_id,
        "username": username,
        "user_id": user_id,
        "scope": scope,
    })
    .to_string()
}

enum ChooserMode {
    Fixed { identity: Identity, secret: String },
    Cancelled,
    Failing(Mutex<Option<AccountError>>),
}

/// A mock account chooser.
///
/// Clones share call counters, so a clone handed to a store can be
/// inspected afterwards.
#[derive(Clone)]
pub struct MockAccountChooser {
    mode: Arc<ChooserMode>,
    choose_count: Arc<Mutex<usize>>,
    secret_count: Arc<Mutex<usize>>,
}

impl MockAccountChooser {
    /// Always choose `username`, whose secret is `secret`.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::with_mode(ChooserMode::Fixed {
            identity: Identity::new(username),
            secret: secret.into(),
        })
    }

    /// Always report that the user cancelled.
    pub fn cancelled() -> Self {
        Self::with_mode(ChooserMode::Cancelled)
    }

    /// Fail the first `choose` call with `error`, then report no account.
    pub fn failing(error: AccountError) -> Self {
        Self::with_mode(ChooserMode::Failing(Mutex::new(Some(error))))
    }

    fn with_mode(mode: ChooserMode) -> Self {
        Self {
            mode: Arc::new(mode),
            choose_count: Arc::new(Mutex::new(0)),
            secret_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of times `choose` was called.
    pub fn choose_count(&self) -> usize {
        *self.choose_count.lock()
    }

    /// Number of times `secret` was called.
    pub fn secret_count(&self) -> usize {
        *self.secret_count.lock()
    }
}

#[async_trait]
impl AccountChooser for MockAccountChooser {
    async fn choose(&self) -> Result<Identity, AccountError> {
        *self.choose_count.lock() += 1;
        match self.mode.as_ref() {
            ChooserMode::Fixed { identity, .. } => Ok(identity.clone()),
            ChooserMode::Cancelled => Err(AccountError::Cancelled),
            ChooserMode::Failing(error) => {
                Err(error.lock().take().unwrap_or(AccountError::NoAccountFound))
            }
        }
    }

    async fn secret(&self, identity: &Identity) -> Result<String, AccountError> {
        *self.secret_count.lock() += 1;
        match self.mode.as_ref() {
            ChooserMode::Fixed { secret, .. } => Ok(secret.clone()),
            _ => Err(AccountError::SecretUnavailable(identity.username.clone())),
        }
    }
}

/// A mock token acquirer.
///
/// Returns queued results in order and records the credentials it was
/// called with. Once the queue is empty every call fails.
#[derive(Clone)]
pub struct MockTokenAcquirer {
    responses: Arc<Mutex<VecDeque<Result<String, AcquireError>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    delay: Option<Duration>,
}

impl MockTokenAcquirer {
    /// Create a mock acquirer with no responses.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Queue a raw token.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.responses.lock().push_back(Ok(token.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: AcquireError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(username, secret)` pairs received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    /// Number of times `acquire` was called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for MockTokenAcquirer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenAcquirer for MockTokenAcquirer {
    async fn acquire(&self, username: &str, secret: &str) -> Result<String, AcquireError> {
        self.calls
            .lock()
            .push((username.to_string(), secret.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(AcquireError::Other("no more mock responses".to_string())))
    }
}
