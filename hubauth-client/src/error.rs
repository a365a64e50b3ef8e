//! Error types for the hub client

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// API Error Types
// ============================================================================

/// Error body returned by the hub
///
/// The login endpoint uses `detail`; other endpoints use `message`. Either
/// may be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorResponse {
    /// The human-readable message, preferring `detail`
    pub fn text(&self) -> Option<&str> {
        self.detail
            .as_deref()
            .or(self.message.as_deref())
            .filter(|s| !s.is_empty())
    }
}

// ============================================================================
// Client Error Types
// ============================================================================

/// Errors that can occur when talking to the hub
#[derive(Debug, Error)]
pub enum HubError {
    /// Credentials were rejected (401/403)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limited by the hub
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Service unavailable or overloaded
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Invalid request (bad parameters, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid response (failed to parse, or no token)
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (bad base URL, bad environment value, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl HubError {
    /// Returns true if this error is retryable
    ///
    /// Retryable errors include:
    /// - Rate limiting (429)
    /// - Service unavailable (5xx)
    /// - Network errors (connection, timeout)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HubError::RateLimited(_) | HubError::ServiceUnavailable(_) | HubError::Network(_)
        )
    }

    /// Returns true if the credentials were rejected
    pub fn is_authentication(&self) -> bool {
        matches!(self, HubError::Authentication(_))
    }

    /// Returns true if a response with this status code may be retried
    ///
    /// 408, 429 and 5xx. Authentication failures never are.
    pub fn is_retryable_status(status_code: u16) -> bool {
        matches!(status_code, 408 | 429 | 500..=599)
    }

    /// Classify an error response into an appropriate error variant
    pub fn from_status(status_code: u16, msg: String) -> Self {
        match status_code {
            401 | 403 => HubError::Authentication(msg),
            408 => HubError::Network(msg),
            429 => HubError::RateLimited(msg),
            500..=599 => HubError::ServiceUnavailable(msg),
            400..=499 => HubError::InvalidRequest(msg),
            _ => HubError::Other(msg),
        }
    }

    /// Classify a transport error into an appropriate error variant
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HubError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            HubError::Network(format!("Connection failed: {}", err))
        } else if err.is_request() {
            HubError::Network(format!("Request failed: {}", err))
        } else if let Some(status) = err.status() {
            HubError::from_status(status.as_u16(), err.to_string())
        } else {
            HubError::Other(err.to_string())
        }
    }
}

/// Configuration for automatic retry behavior
///
/// - Exponential backoff: base_delay × 2^attempt with jitter
/// - Maximum delay capped at 8 seconds
/// - Respects the Retry-After header
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2)
    pub max_retries: u32,

    /// Base delay for exponential backoff (default: 500ms)
    pub base_delay: Duration,

    /// Maximum delay between retries (default: 8s)
    pub max_delay: Duration,

    /// Jitter factor (0.0-1.0) to add randomness to delays (default: 0.25)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: 0.25,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the specified max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Disable retries
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given retry attempt (0-indexed)
    ///
    /// The result never exceeds `max_delay`, however large `attempt` is.
    pub(crate) fn delay_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let max_secs = self.max_delay.as_secs_f64();
        let exp = 2_f64.powi(attempt.min(63) as i32);
        let base = (self.base_delay.as_secs_f64() * exp).min(max_secs);

        let jitter_range = base * self.jitter;
        let jitter = if jitter_range.is_finite() && jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let delay_secs = (base + jitter).clamp(0.0, max_secs);

        Duration::try_from_secs_f64(delay_secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Parse a retry delay from the `retry-after` header
    ///
    /// Only the delay-seconds form is understood; HTTP dates are ignored.
    pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get(reqwest::header::RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }
}
