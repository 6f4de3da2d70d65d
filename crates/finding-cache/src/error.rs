use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Cache backend failures. Always non-fatal to the pipeline: callers log
/// and treat the operation as a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
