use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while deriving chunks from a unit.
///
/// Chunking failures are local and non-retryable: they fail the unit without
/// ever reaching the dispatcher.
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// The unit has no content to analyze
    #[error("empty unit: nothing to analyze")]
    EmptyUnit,

    /// The unit could not be read from disk
    #[error("unreadable unit {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid chunking parameters
    #[error("invalid chunking configuration: {0}")]
    InvalidConfig(String),

    /// Unsupported language for structural boundary detection
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

impl ChunkerError {
    pub fn unreadable(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }
}
