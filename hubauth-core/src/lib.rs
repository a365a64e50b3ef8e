//! # hubauth-core
//!
//! Scope-aware credential sessions for registry hub access tokens.
//!
//! A [`SessionStore`] keeps the sessions a process has signed in with. New
//! sessions come from [`SessionStore::create_session`], which asks an
//! [`AccountChooser`] who to sign in as, logs in through a
//! [`TokenAcquirer`], and only keeps the token if the scope it grants covers
//! the scopes the caller asked for.
//!
//! ## Scopes
//!
//! Scopes form a single ordering, from most to least permissive:
//!
//! | Scope              | Rank |
//! |--------------------|------|
//! | `""` (empty)       | 0    |
//! | `repo:admin`       | 1    |
//! | `repo:write`       | 2    |
//! | `repo:read`        | 3    |
//! | `repo:public_read` | 4    |
//!
//! A set of available scopes satisfies a set of desired scopes when its
//! most permissive member ranks at or below the most permissive desired
//! member. See [`scope::is_satisfied_by`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use hubauth_core::{HubTokenAcquirer, SessionStore, StaticAccountChooser};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SessionStore::new(
//!         StaticAccountChooser::from_env()?,
//!         HubTokenAcquirer::from_env()?,
//!     );
//!
//!     let (_, mut changes) = store.subscribe_channel();
//!     let session = store.create_session(&["repo:write"]).await?;
//!     println!("signed in as {}", session.account.label);
//!
//!     while let Ok(event) = changes.try_recv() {
//!         println!("{} session(s) added", event.added().len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `hub`: [`HubTokenAcquirer`], which logs in with `hubauth-client`
//! - `test-utils`: mock collaborators in [`test_utils`]

pub mod account;
pub mod acquirer;
mod error;
pub mod events;
pub mod scope;
pub mod session;
pub mod store;
pub mod token;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use account::{AccountChooser, AccountError, Identity, StaticAccountChooser};
pub use acquirer::{AcquireError, TokenAcquirer};
pub use error::{AuthError, Result};
pub use events::{HookId, SessionChangeEvent, SessionHook};
pub use scope::{InvalidScope, PermissionScope};
pub use session::{AccountInfo, CredentialSession};
pub use store::SessionStore;
pub use token::HubToken;

#[cfg(feature = "hub")]
pub use acquirer::HubTokenAcquirer;
