use thiserror::Error;

/// Failure modes of chunk inference.
///
/// The transient/fatal split drives the retry policy: transient failures
/// are retried with backoff up to the configured limit, everything else
/// aborts the chunk immediately. None of these abort sibling chunks.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Retryable: rate limits, attempt timeouts, backend hiccups
    #[error("transient inference failure: {0}")]
    Transient(String),

    /// Not retryable: malformed chunk, capability rejected the input
    #[error("fatal inference failure: {0}")]
    Fatal(String),

    /// The unit's wall-clock budget expired before this chunk finished
    #[error("unit budget exhausted before chunk completed")]
    Timeout,

    /// The run was cancelled before this chunk was dispatched
    #[error("analysis cancelled before chunk was dispatched")]
    Cancelled,
}

impl InferenceError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
