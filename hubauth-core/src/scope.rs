//! Registry permission scopes.
//!
//! Hub tokens carry exactly one scope drawn from a small, closed set. The set
//! is linearly ordered from most to least permissive, so every scope grants
//! everything the scopes after it grant:
//!
//! | Rank | Scope | Meaning |
//! |------|-------|---------|
//! | 0 | `""` | Login not narrowed to any repository level |
//! | 1 | `repo:admin` | Administer repositories |
//! | 2 | `repo:write` | Push to repositories |
//! | 3 | `repo:read` | Pull private repositories |
//! | 4 | `repo:public_read` | Pull public repositories |
//!
//! Raw strings are converted at the boundary (parsing, deserialization) and
//! anything outside the table is rejected with [`InvalidScope`]. Once a value
//! is a [`PermissionScope`] the comparisons are infallible.
//!
//! # Example
//!
//! ```rust
//! use hubauth_core::scope::{self, PermissionScope};
//!
//! // Admin access satisfies a request for write access
//! assert!(scope::is_satisfied_by(&["repo:write"], &["repo:admin"]).unwrap());
//!
//! // Read access does not
//! assert!(!scope::is_satisfied_by(&["repo:write"], &["repo:read"]).unwrap());
//!
//! // Unknown scopes are rejected, not skipped
//! assert!(scope::is_satisfied_by(&["bogus"], &["repo:admin"]).is_err());
//!
//! assert_eq!(PermissionScope::RepoWrite.rank(), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A scope string that is not part of the fixed permission set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid scope '{0}'")]
pub struct InvalidScope(pub String);

/// A permission level granted by a hub access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PermissionScope {
    /// The empty scope string.
    ///
    /// Issued for a login that was not narrowed to a `repo:*` level. It ranks
    /// first, so it satisfies every request.
    Empty,
    /// `repo:admin`
    RepoAdmin,
    /// `repo:write`
    RepoWrite,
    /// `repo:read`
    RepoRead,
    /// `repo:public_read`
    RepoPublicRead,
}

impl PermissionScope {
    /// Every scope, most permissive first. The index of a scope in this table
    /// is its rank.
    pub const ALL: [PermissionScope; 5] = [
        PermissionScope::Empty,
        PermissionScope::RepoAdmin,
        PermissionScope::RepoWrite,
        PermissionScope::RepoRead,
        PermissionScope::RepoPublicRead,
    ];

    /// Rank given to an empty scope list: below every real scope.
    pub const NONE_RANK: usize = Self::ALL.len();

    /// The wire representation of this scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionScope::Empty => "",
            PermissionScope::RepoAdmin => "repo:admin",
            PermissionScope::RepoWrite => "repo:write",
            PermissionScope::RepoRead => "repo:read",
            PermissionScope::RepoPublicRead => "repo:public_read",
        }
    }

    /// Position in [`Self::ALL`]. Lower is more permissive.
    pub fn rank(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Self::NONE_RANK)
    }

    /// Check whether `self` grants at least the access of `other`.
    pub fn covers(self, other: PermissionScope) -> bool {
        self.rank() <= other.rank()
    }

    /// Check whether the `available` scopes grant at least the access the
    /// `desired` scopes ask for.
    ///
    /// Only the most permissive scope on each side matters. An empty
    /// `desired` list asks for nothing and is always satisfied; an empty
    /// `available` list grants nothing.
    pub fn satisfies(desired: &[PermissionScope], available: &[PermissionScope]) -> bool {
        highest_rank(available) <= highest_rank(desired)
    }

    /// Parse a list of scope strings, rejecting the whole list if any entry
    /// is invalid.
    pub fn parse_all<S: AsRef<str>>(scopes: &[S]) -> Result<Vec<PermissionScope>, InvalidScope> {
        scopes.iter().map(|s| s.as_ref().parse()).collect()
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionScope {
    type Err = InvalidScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| InvalidScope(s.to_string()))
    }
}

impl TryFrom<String> for PermissionScope {
    type Error = InvalidScope;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PermissionScope> for String {
    fn from(scope: PermissionScope) -> Self {
        scope.as_str().to_string()
    }
}

/// Smallest rank in the list, or [`PermissionScope::NONE_RANK`] when empty.
fn highest_rank(scopes: &[PermissionScope]) -> usize {
    scopes
        .iter()
        .map(|s| s.rank())
        .min()
        .unwrap_or(PermissionScope::NONE_RANK)
}

/// Check whether a scope string belongs to the permission set.
pub fn validate(scope: &str) -> bool {
    scope.parse::<PermissionScope>().is_ok()
}

/// Rank of a scope string (0 = most permissive).
pub fn rank(scope: &str) -> Result<usize, InvalidScope> {
    scope.parse::<PermissionScope>().map(PermissionScope::rank)
}

/// String form of [`PermissionScope::satisfies`].
///
/// Every entry of both lists is validated before any ranking happens; a
/// single unknown scope fails the whole call.
pub fn is_satisfied_by<D, A>(desired: &[D], available: &[A]) -> Result<bool, InvalidScope>
where
    D: AsRef<str>,
    A: AsRef<str>,
{
    let desired = PermissionScope::parse_all(desired)?;
    let available = PermissionScope::parse_all(available)?;
    Ok(PermissionScope::satisfies(&desired, &available))
}

/// Join scopes for display, e.g. `[repo:write, repo:read]`.
pub fn format_scopes(scopes: &[PermissionScope]) -> String {
    let parts: Vec<String> = scopes
        .iter()
        .map(|s| match s {
            PermissionScope::Empty => "\"\"".to_string(),
            other => other.to_string(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}
