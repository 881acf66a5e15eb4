use thiserror::Error;

/// Rejected request input. Raised before any remote call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    InvalidQuery(String),

    #[error("{0}")]
    InvalidUrl(String),

    #[error("Invalid request body: {0}")]
    MalformedBody(String),
}

/// Failure of a single call to the remote search/answer service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimitExceeded { retry_after_secs: Option<u64> },

    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl UpstreamError {
    /// Transient failures that a caller could reasonably retry.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_)
                | Self::RequestFailed(_)
                | Self::Timeout { .. }
                | Self::RateLimitExceeded { .. }
        )
    }
}

/// Outcome of the single-call operations, which surface upstream failures
/// instead of degrading them.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Related-query generation could not produce candidates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("no topic left in query {0:?} after stripping question words")]
    EmptyTopic(String),

    #[error("strategy produced no candidates")]
    NoCandidates,
}
