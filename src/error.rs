//! Error types for video job submission, polling and download.

use std::time::Duration;

/// Longest error body kept in an error message, in characters.
const MAX_ERROR_MESSAGE_CHARS: usize = 1000;

/// Errors that can occur while running a video generation job.
#[derive(Debug, thiserror::Error)]
pub enum SoraError {
    /// API key rejected by the service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned a non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// The task did not reach a terminal status within the wait budget.
    #[error("task timeout after {}s. last={last}", .waited.as_secs())]
    Timeout { waited: Duration, last: String },

    /// The service reported a failed, errored or cancelled task.
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// The create response carried no usable task id.
    #[error("create response missing id: {0}")]
    MissingTaskId(String),

    /// The final query response carried no video URL.
    #[error("missing video_url in response: {0}")]
    MissingVideoUrl(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (e.g., writing the downloaded file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SoraError {
    /// Returns true if this error is likely transient and worth retrying.
    ///
    /// Task timeouts and task failures are terminal: retrying them would
    /// submit a brand new job.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

/// Result type alias for video job operations.
pub type Result<T> = std::result::Result<T, SoraError>;

/// Cleans a raw response body for inclusion in an error message.
///
/// Control characters other than newlines are dropped, surrounding
/// whitespace is trimmed and the text is capped at 1000 characters.
pub fn sanitize_error_message(text: &str) -> String {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();

    if cleaned.chars().count() <= MAX_ERROR_MESSAGE_CHARS {
        return cleaned;
    }

    let mut truncated: String = cleaned.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
    truncated.push_str("...");
    truncated
}

/// Reads a `Retry-After` header given in whole seconds.
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Maps a non-success HTTP response to an error.
pub(crate) fn error_from_status(
    status: u16,
    text: &str,
    headers: &reqwest::header::HeaderMap,
) -> SoraError {
    let text = sanitize_error_message(text);
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return SoraError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return SoraError::Auth(text);
    }
    SoraError::Api {
        status,
        message: text,
    }
}
