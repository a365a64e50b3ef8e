//! Hub token parsing.
//!
//! The login endpoint returns an opaque token string. Its claims are a JSON
//! object with at least `session_id`, `username`, `user_id` and `scope`.
//! The string is either that object itself or a JWT whose payload segment
//! is that object. Signatures are not checked here; the token is only read
//! to learn which session, account and scope it represents.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;

use crate::error::AuthError;
use crate::scope::PermissionScope;

/// Claims carried by a hub token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubToken {
    /// Session identifier assigned by the hub.
    pub session_id: String,
    /// Account display name.
    pub username: String,
    /// Stable account identifier.
    pub user_id: String,
    /// Scope granted by this token.
    pub scope: PermissionScope,
}

/// Raw claims as they appear on the wire.
///
/// Each field is optional so that "absent" can be told apart from "present
/// but empty". An empty `scope` is a real value; a missing one is not.
#[derive(Debug, Deserialize)]
struct RawClaims {
    session_id: Option<String>,
    username: Option<String>,
    user_id: Option<String>,
    scope: Option<String>,
}

impl HubToken {
    /// Parse the claims out of a raw token string.
    ///
    /// Fails with [`AuthError::MalformedToken`] when the payload cannot be
    /// read or a required field is missing, and with
    /// [`AuthError::InvalidScope`] when the scope is not a known value.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let payload = claims_payload(raw)?;
        let claims: RawClaims = serde_json::from_slice(&payload)
            .map_err(|e| AuthError::MalformedToken(format!("invalid claims: {}", e)))?;

        let session_id = require(claims.session_id, "session_id")?;
        let username = require(claims.username, "username")?;
        let user_id = require(claims.user_id, "user_id")?;
        let scope = require(claims.scope, "scope")?.parse::<PermissionScope>()?;

        Ok(Self {
            session_id,
            username,
            user_id,
            scope,
        })
    }
}

fn require(field: Option<String>, name: &str) -> Result<String, AuthError> {
    field.ok_or_else(|| AuthError::MalformedToken(format!("missing required field '{}'", name)))
}

/// Extract the JSON claims bytes from a bare JSON token or a JWT.
fn claims_payload(raw: &str) -> Result<Vec<u8>, AuthError> {
    let raw = raw.trim();

    if raw.starts_with('{') {
        return Ok(raw.as_bytes().to_vec());
    }

    let segments: Vec<&str> = raw.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::MalformedToken(
            "token is neither a JSON object nor a JWT".to_string(),
        ));
    }

    URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| AuthError::MalformedToken(format!("invalid JWT payload encoding: {}", e)))
}
