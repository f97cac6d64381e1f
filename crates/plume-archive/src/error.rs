use std::time::Duration;

/// Errors from archive operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The path does not exist in the archive.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path already exists (directory creation).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The operation did not finish within the caller's timeout.
    #[error("timed out after {after:?}: {path}")]
    Timeout { path: String, after: Duration },

    /// The archive's peers could not be reached.
    #[error("archive unreachable: {0}")]
    Unreachable(String),

    /// The path is malformed or escapes the archive root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The URL could not be opened as an archive.
    #[error("invalid archive url: {0}")]
    InvalidUrl(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// Result alias for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
