//! Top-level error type for session operations
//!
//! Every failure aborts the operation that raised it without touching the
//! session map and without emitting a change event. Nothing here is retried
//! automatically; [`AuthError::is_retryable`] tells callers which failures a
//! retry could fix.

use thiserror::Error;

use crate::account::AccountError;
use crate::acquirer::AcquireError;
use crate::scope::{format_scopes, InvalidScope, PermissionScope};

/// Errors raised by [`crate::SessionStore`] and token parsing
///
/// - [`AuthError::InvalidScope`] - A scope outside the permission set (caller or data bug)
/// - [`AuthError::MalformedToken`] - The token is missing a required field
/// - [`AuthError::ScopeNotGranted`] - Login worked but the token grants too little
/// - [`AuthError::Cancelled`] - The user backed out of account selection
/// - [`AuthError::AccountSelectionFailed`] - No usable account
/// - [`AuthError::TokenAcquisitionFailed`] - Login request failed
#[derive(Debug, Error)]
pub enum AuthError {
    /// Value outside the fixed permission set
    #[error("invalid scope '{0}'")]
    InvalidScope(String),

    /// Required field missing or unreadable token payload
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The token grants less access than requested
    #[error(
        "scope not granted: requested {}, token grants '{}'",
        format_scopes(.desired),
        .granted
    )]
    ScopeNotGranted {
        /// Scopes the caller asked for
        desired: Vec<PermissionScope>,
        /// Scope the token actually carries
        granted: PermissionScope,
    },

    /// Account selection was cancelled
    #[error("account selection cancelled")]
    Cancelled,

    /// Account selection failed for a reason other than cancellation
    #[error("account selection failed: {0}")]
    AccountSelectionFailed(#[source] AccountError),

    /// The login request failed
    #[error("token acquisition failed: {0}")]
    TokenAcquisitionFailed(#[source] AcquireError),
}

impl AuthError {
    /// Returns true if this is an invalid scope error
    pub fn is_invalid_scope(&self) -> bool {
        matches!(self, Self::InvalidScope(_))
    }

    /// Returns true if the token was malformed
    pub fn is_malformed_token(&self) -> bool {
        matches!(self, Self::MalformedToken(_))
    }

    /// Returns true if the token granted insufficient scope
    pub fn is_scope_not_granted(&self) -> bool {
        matches!(self, Self::ScopeNotGranted { .. })
    }

    /// Returns true if account selection was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if the login request failed
    pub fn is_token_acquisition(&self) -> bool {
        matches!(self, Self::TokenAcquisitionFailed(_))
    }

    /// Returns true if this error is potentially retryable
    ///
    /// Only network-level login failures qualify. Bad credentials, bad
    /// scopes and bad tokens need a different input, not another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TokenAcquisitionFailed(e) if e.is_network())
    }
}

impl From<InvalidScope> for AuthError {
    fn from(err: InvalidScope) -> Self {
        Self::InvalidScope(err.0)
    }
}

impl From<AccountError> for AuthError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Cancelled => Self::Cancelled,
            other => Self::AccountSelectionFailed(other),
        }
    }
}

impl From<AcquireError> for AuthError {
    fn from(err: AcquireError) -> Self {
        Self::TokenAcquisitionFailed(err)
    }
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_invalid_scope() {
        let err: AuthError = InvalidScope("bogus".into()).into();
        assert!(err.is_invalid_scope());
        assert_eq!(err.to_string(), "invalid scope 'bogus'");
    }

    #[test]
    fn test_from_account_error() {
        let err: AuthError = AccountError::Cancelled.into();
        assert!(err.is_cancelled());

        let err: AuthError = AccountError::NoAccountFound.into();
        assert!(matches!(
            err,
            AuthError::AccountSelectionFailed(AccountError::NoAccountFound)
        ));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_from_acquire_error() {
        let err: AuthError = AcquireError::AuthFailed("bad password".into()).into();
        assert!(err.is_token_acquisition());
        assert!(!err.is_retryable());

        let err: AuthError = AcquireError::Network("connection refused".into()).into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_scope_not_granted_message() {
        let err = AuthError::ScopeNotGranted {
            desired: vec![PermissionScope::RepoWrite],
            granted: PermissionScope::RepoRead,
        };
        assert!(err.is_scope_not_granted());
        assert_eq!(
            err.to_string(),
            "scope not granted: requested [repo:write], token grants 'repo:read'"
        );
    }

    #[test]
    fn test_not_retryable() {
        assert!(!AuthError::InvalidScope("x".into()).is_retryable());
        assert!(!AuthError::MalformedToken("x".into()).is_retryable());
        assert!(!AuthError::Cancelled.is_retryable());
    }
}
