use thiserror::Error;

/// Errors surfaced by the public matching operations.
///
/// Partial degradation is not an error: it is reported on the
/// [`FilteringResult`](crate::models::FilteringResult) instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// Malformed or missing preference / classification data. Never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The circuit is open or retries were exhausted. Try again later.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl FilterError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Short machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

/// Errors raised by a single round-trip to the school catalog store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store request timed out after {0}ms")]
    Timeout(u64),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Store returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    Decode(String),

    #[error("Circuit open: store calls suspended for {remaining_ms}ms")]
    CircuitOpen { remaining_ms: u64 },

    #[error("Rate limit wait exceeded")]
    Throttled,
}

impl StoreError {
    /// Whether a retry might succeed. Timeouts, connection failures,
    /// 408, 429 and 5xx responses are transient; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Http { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Decode(_) | Self::CircuitOpen { .. } | Self::Throttled => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(0)
        } else if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            StoreError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            StoreError::Connection(err.to_string())
        }
    }
}

impl From<StoreError> for FilterError {
    fn from(err: StoreError) -> Self {
        FilterError::StoreUnavailable(err.to_string())
    }
}
