use plume_archive::ArchiveError;

/// Errors from cached document operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backing archive failed to read or write.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// The file was read but is not valid JSON.
    #[error("malformed JSON in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    /// Returns `true` if the underlying read timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Archive(e) if e.is_timeout())
    }

    /// Returns `true` if the backing file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Archive(e) if e.is_not_found())
    }
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
