use std::path::PathBuf;
use thiserror::Error;

/// Common result type for core operations.
pub type Result<T> = std::result::Result<T, AccessError>;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("invalid size: {0}")]
    InvalidSize(String),
    #[error("value out of range: {0}")]
    OutOfRange(String),
    #[error("can't resolve path {}: {source}", path.display())]
    PathResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rule source error: {0}")]
    RuleSource(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
