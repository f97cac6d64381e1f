use plume_archive::ArchiveError;
use plume_cache::CacheError;
use plume_feed::FeedError;
use plume_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid site url: {0:?}")]
    InvalidSiteUrl(String),

    #[error("not a broadcast of this site: {0}")]
    InvalidBroadcastPath(String),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("broadcast error: {0}")]
    Feed(#[from] FeedError),

    #[error("document error: {0}")]
    Document(TypeError),
}

impl From<TypeError> for ProfileError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::MissingParameter(name) => Self::MissingParameter(name),
            TypeError::InvalidSiteUrl(url) => Self::InvalidSiteUrl(url),
            other => Self::Document(other),
        }
    }
}

pub type ProfileResult<T> = Result<T, ProfileError>;
