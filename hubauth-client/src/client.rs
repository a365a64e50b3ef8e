//! Registry hub API client

use crate::error::{ApiErrorResponse, HubError, RetryConfig};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "https://hub.docker.com";

/// Default login endpoint path
pub const DEFAULT_LOGIN_PATH: &str = "/v2/users/login";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent
const DEFAULT_USER_AGENT: &str = concat!("hubauth/", env!("CARGO_PKG_VERSION"));

/// Environment variable overriding the API base URL
pub const API_BASE_ENV: &str = "HUBAUTH_API_BASE";

/// Environment variable overriding the request timeout, in seconds
pub const TIMEOUT_ENV: &str = "HUBAUTH_TIMEOUT_SECS";

// ============================================================================
// Login Types
// ============================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct RawLoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Successful login
#[derive(Clone, PartialEq, Eq)]
pub struct LoginResponse {
    /// Access token issued by the hub
    pub token: String,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Client
// ============================================================================

/// Registry hub API client
///
/// Holds no credentials of its own; they are passed to each
/// [`HubClient::login`] call.
#[derive(Debug, Clone)]
pub struct HubClient {
    client: reqwest::Client,
    api_base: String,
    login_path: String,
    retry_config: RetryConfig,
}

impl HubClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self, HubError> {
        Self::builder().build()
    }

    /// Create a client configured from the environment
    ///
    /// Reads `HUBAUTH_API_BASE` and `HUBAUTH_TIMEOUT_SECS`; both are optional.
    pub fn from_env() -> Result<Self, HubError> {
        let mut builder = Self::builder();

        if let Ok(api_base) = std::env::var(API_BASE_ENV) {
            builder = builder.api_base(api_base);
        }

        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                HubError::Configuration(format!("{} must be a whole number of seconds", TIMEOUT_ENV))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Create a builder for more advanced configuration
    pub fn builder() -> HubClientBuilder {
        HubClientBuilder::new()
    }

    /// The API base URL requests are sent to
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The full login URL
    pub fn login_url(&self) -> String {
        format!("{}{}", self.api_base, self.login_path)
    }

    /// Exchange a username and password (or personal access token) for an
    /// access token
    ///
    /// # Example
    ///
    /// ```no_run
    /// use hubauth_client::HubClient;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = HubClient::from_env()?;
    /// let response = client.login("alice", "dckr_pat_example").await?;
    /// println!("token is {} bytes", response.token.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, HubError> {
        let body = LoginRequest { username, password };
        debug!("logging in to {} as '{}'", self.api_base, username);

        let raw: RawLoginResponse = self.post_with_retry(&self.login_url(), &body).await?;
        match raw.token {
            Some(token) if !token.is_empty() => Ok(LoginResponse { token }),
            _ => Err(HubError::InvalidResponse(
                "login response did not contain a token".to_string(),
            )),
        }
    }

    /// POST a JSON body with automatic retry
    ///
    /// Retries 408, 429, 5xx and transport failures with exponential backoff,
    /// honouring `Retry-After`. Authentication failures are returned at once.
    async fn post_with_retry<T, B>(&self, url: &str, body: &B) -> Result<T, HubError>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut last_error: Option<HubError> = None;

        for attempt in 0..=self.retry_config.max_retries {
            let result = self.client.post(url).json(body).send().await;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response.text().await.map_err(HubError::from_reqwest_error)?;
                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            HubError::InvalidResponse(format!("Failed to parse response: {}", e))
                        });
                    }

                    let status_code = status.as_u16();
                    let retry_after = RetryConfig::parse_retry_after(response.headers());
                    let error_body = response.text().await.unwrap_or_default();
                    let error = parse_error_response(&error_body, status_code);

                    if attempt < self.retry_config.max_retries
                        && HubError::is_retryable_status(status_code)
                    {
                        let delay = retry_after
                            .unwrap_or_else(|| self.retry_config.delay_for_attempt(attempt));
                        warn!(
                            "hub returned {} (attempt {}), retrying in {:?}",
                            status_code,
                            attempt + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(error);
                        continue;
                    }

                    return Err(error);
                }
                Err(e) => {
                    let error = HubError::from_reqwest_error(e);

                    if attempt < self.retry_config.max_retries && error.is_retryable() {
                        let delay = self.retry_config.delay_for_attempt(attempt);
                        warn!("{} (attempt {}), retrying in {:?}", error, attempt + 1, delay);
                        tokio::time::sleep(delay).await;
                        last_error = Some(error);
                        continue;
                    }

                    return Err(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| HubError::Other("Max retries exceeded".to_string())))
    }
}

/// Builder for [`HubClient`] configuration
///
/// Create with [`HubClient::builder()`]. Every setting has a default.
pub struct HubClientBuilder {
    api_base: Option<String>,
    login_path: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    retry_config: Option<RetryConfig>,
}

impl HubClientBuilder {
    fn new() -> Self {
        Self {
            api_base: None,
            login_path: None,
            timeout: None,
            user_agent: None,
            retry_config: None,
        }
    }

    /// Set a custom API base URL
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Set a custom login path (default: `/v2/users/login`)
    pub fn login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = Some(login_path.into());
        self
    }

    /// Set the request timeout (default: 30s)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the maximum number of retries (default: 2)
    ///
    /// Set to 0 to disable retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        let mut config = self.retry_config.take().unwrap_or_default();
        config.max_retries = max_retries;
        self.retry_config = Some(config);
        self
    }

    /// Set custom retry configuration
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HubClient, HubError> {
        let api_base = self
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(HubError::Configuration(format!(
                "API base must be an http(s) URL, got '{}'",
                api_base
            )));
        }

        let login_path = self
            .login_path
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());
        let login_path = if login_path.starts_with('/') {
            login_path
        } else {
            format!("/{}", login_path)
        };

        let client = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(
                self.user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            )
            .build()
            .map_err(|e| HubError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HubClient {
            client,
            api_base,
            login_path,
            retry_config: self.retry_config.unwrap_or_default(),
        })
    }
}

/// Turn an error response body into a [`HubError`]
fn parse_error_response(body: &str, status_code: u16) -> HubError {
    let msg = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|e| e.text().map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {}", status_code)
            } else {
                body.trim().to_string()
            }
        });

    HubError::from_status(status_code, msg)
}
