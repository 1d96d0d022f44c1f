use thiserror::Error;

/// The five error classes spec §4.3 requires the adapter to map every
/// provider/IO failure into. The adapter never lets an error escape upward —
/// every path here is surfaced as one of these variants.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("bad response from provider: {0}")]
    BadResponse(String),

    #[error("screenshot file missing or never stabilized: {0}")]
    FileMissing(String),
}

impl LlmError {
    /// The short label used in `ai_response.text` (`"⚠️ An error occurred: <kind>"`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Auth(_) => "auth",
            Self::RateLimit(_) => "rate_limit",
            Self::BadResponse(_) => "bad_response",
            Self::FileMissing(_) => "file_missing",
        }
    }

    /// The provider-supplied detail, for `ai_response.error_details`.
    pub fn detail(&self) -> String {
        match self {
            Self::Network(d)
            | Self::Timeout(d)
            | Self::Auth(d)
            | Self::RateLimit(d)
            | Self::BadResponse(d)
            | Self::FileMissing(d) => d.clone(),
        }
    }

    /// Classify an HTTP status code the way both providers' error bodies do.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::Auth(body),
            429 => Self::RateLimit(body),
            408 => Self::Timeout(body),
            _ => Self::BadResponse(format!("HTTP {status}: {body}")),
        }
    }
}
