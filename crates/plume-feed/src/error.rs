use plume_archive::ArchiveError;
use thiserror::Error;

/// Why a feed entry's content could not be loaded.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: ArchiveError,
    },

    #[error("malformed broadcast {path}: {reason}")]
    Parse { path: String, reason: String },
}

impl FeedError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.is_timeout())
    }
}
