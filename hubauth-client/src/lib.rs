//! Minimal registry hub login client for hubauth
//!
//! Exchanges a username and password (or personal access token) for the
//! access token issued by the hub's login endpoint.
//!
//! # Quick Start
//!
//! ```no_run
//! use hubauth_client::HubClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HubClient::builder()
//!     .api_base("https://hub.docker.com")
//!     .max_retries(3)
//!     .build()?;
//!
//! let login = client.login("alice", "dckr_pat_example").await?;
//! println!("signed in, token is {} bytes", login.token.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Errors and retries
//!
//! Failed requests map to [`HubError`]. Rate limiting (429), server errors
//! (5xx), request timeouts (408) and transport failures are retried with
//! exponential backoff, honouring `Retry-After`. Rejected credentials
//! (401/403) are returned immediately.

mod client;
mod error;

pub use client::{
    HubClient, HubClientBuilder, LoginResponse, API_BASE_ENV, DEFAULT_API_BASE,
    DEFAULT_LOGIN_PATH, TIMEOUT_ENV,
};
pub use error::{ApiErrorResponse, HubError, RetryConfig};
