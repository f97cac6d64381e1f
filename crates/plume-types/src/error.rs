use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid site url: {0:?}")]
    InvalidSiteUrl(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for type operations.
pub type Result<T> = std::result::Result<T, TypeError>;
