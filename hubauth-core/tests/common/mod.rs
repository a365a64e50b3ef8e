//! Common test utilities shared across test files.
//!
//! Items here may not be used by all test files, hence the module-level allow.
#![allow(dead_code)]

use async_trait::async_trait;
use hubauth_core::{
    AcquireError, AccountChooser, AccountError, Identity, SessionChangeEvent, TokenAcquirer,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ===== Account choosers =====

/// Picks accounts from a fixed list, cycling through them in order.
pub struct ListChooser {
    accounts: Vec<(String, String)>,
    next: Mutex<usize>,
}

impl ListChooser {
    pub fn new(accounts: &[(&str, &str)]) -> Self {
        Self {
            accounts: accounts
                .iter()
                .map(|(u, p)| (u.to_string(), p.to_string()))
                .collect(),
            next: Mutex::new(0),
        }
    }
}

#[async_trait]
impl AccountChooser for ListChooser {
    async fn choose(&self) -> Result<Identity, AccountError> {
        if self.accounts.is_empty() {
            return Err(AccountError::Cancelled);
        }
        let mut next = self.next.lock().unwrap();
        let (username, _) = &self.accounts[*next % self.accounts.len()];
        *next += 1;
        Ok(Identity::new(username.clone()))
    }

    async fn secret(&self, identity: &Identity) -> Result<String, AccountError> {
        self.accounts
            .iter()
            .find(|(u, _)| *u == identity.username)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| AccountError::SecretUnavailable(identity.username.clone()))
    }
}

// ===== Token acquirers =====

/// A fake hub: issues a token per user, rejecting wrong passwords.
pub struct FakeHub {
    users: HashMap<String, (String, String)>,
    issued: Mutex<usize>,
}

impl FakeHub {
    /// `users` maps username to `(password, scope)`.
    pub fn new(users: &[(&str, &str, &str)]) -> Self {
        Self {
            users: users
                .iter()
                .map(|(u, p, s)| (u.to_string(), (p.to_string(), s.to_string())))
                .collect(),
            issued: Mutex::new(0),
        }
    }

    pub fn issued(&self) -> usize {
        *self.issued.lock().unwrap()
    }
}

#[async_trait]
impl TokenAcquirer for FakeHub {
    async fn acquire(&self, username: &str, secret: &str) -> Result<String, AcquireError> {
        let (password, scope) = self
            .users
            .get(username)
            .ok_or_else(|| AcquireError::AuthFailed(format!("unknown user {}", username)))?;
        if password != secret {
            return Err(AcquireError::AuthFailed("incorrect password".to_string()));
        }

        let mut issued = self.issued.lock().unwrap();
        *issued += 1;
        Ok(serde_json::json!({
            "session_id": format!("{}-{}", username, issued),
            "username": username,
            "user_id": format!("uid-{}", username),
            "scope": scope,
        })
        .to_string())
    }
}

// ===== Event recording =====

/// Collects every event delivered to it.
#[derive(Clone, Default)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<SessionChangeEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(&self) -> impl Fn(&SessionChangeEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &SessionChangeEvent| events.lock().unwrap().push(event.clone())
    }

    pub fn events(&self) -> Vec<SessionChangeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn added_ids(&self) -> Vec<String> {
        self.events()
            .iter()
            .flat_map(|e| e.added().iter().map(|s| s.id.clone()).collect::<Vec<_>>())
            .collect()
    }

    pub fn removed_ids(&self) -> Vec<String> {
        self.events()
            .iter()
            .flat_map(|e| e.removed().iter().map(|s| s.id.clone()).collect::<Vec<_>>())
            .collect()
    }
}
