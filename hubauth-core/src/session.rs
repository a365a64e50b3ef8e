//! Credential session records.

use serde::Serialize;

use crate::scope::PermissionScope;
use crate::token::HubToken;

/// The account a session was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    /// Stable account identifier (`user_id` claim).
    pub id: String,
    /// Display name (`username` claim).
    pub label: String,
}

/// An authenticated, scope-bound credential held in memory.
///
/// Sessions only come from a successful login whose token satisfied the
/// requested scopes. The access token is a bearer secret: it is skipped by
/// `Debug` and by serialization.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSession {
    /// Session identifier assigned by the hub.
    pub id: String,
    /// Raw token to present as a bearer credential.
    #[serde(skip)]
    pub access_token: String,
    /// Account the token was issued to.
    pub account: AccountInfo,
    /// Scopes the token grants.
    pub scopes: Vec<PermissionScope>,
}

impl CredentialSession {
    /// Build a session from parsed claims and the raw token they came from.
    pub fn from_token(token: HubToken, access_token: impl Into<String>) -> Self {
        Self {
            id: token.session_id,
            access_token: access_token.into(),
            account: AccountInfo {
                id: token.user_id,
                label: token.username,
            },
            scopes: vec![token.scope],
        }
    }

    /// Check whether this session grants at least the `desired` scopes.
    pub fn satisfies(&self, desired: &[PermissionScope]) -> bool {
        PermissionScope::satisfies(desired, &self.scopes)
    }
}

impl std::fmt::Debug for CredentialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSession")
            .field("id", &self.id)
            .field("access_token", &"[REDACTED]")
            .field("account", &self.account)
            .field("scopes", &self.scopes)
            .finish()
    }
}
