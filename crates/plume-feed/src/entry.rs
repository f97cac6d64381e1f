use std::sync::Arc;

use plume_archive::EntryStat;
use plume_types::Document;

use crate::builder::FeedSource;
use crate::error::FeedError;

/// One broadcast in a feed.
///
/// Rebuilt on every query; never persisted.
pub struct FeedEntry<S> {
    /// Archive path of the broadcast file.
    pub name: String,
    /// Listing metadata.
    pub stat: EntryStat,
    /// The site that published the broadcast.
    pub author: Arc<S>,
    /// Milliseconds since the UNIX epoch, parsed from the file name.
    pub publish_time: u64,
    /// Parsed content; `None` in metadata-only feeds or after a failed read.
    pub content: Option<Document>,
    /// Why the content could not be loaded.
    pub error: Option<FeedError>,
}

impl<S> FeedEntry<S> {
    /// A metadata-only entry.
    pub fn new(stat: EntryStat, author: Arc<S>, publish_time: u64) -> Self {
        Self {
            name: stat.name.clone(),
            stat,
            author,
            publish_time,
            content: None,
            error: None,
        }
    }

    /// Returns `true` once content was read successfully.
    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }
}

impl<S: FeedSource> FeedEntry<S> {
    /// Full reference to the broadcast: author URL followed by the path.
    pub fn reference(&self) -> String {
        format!("{}{}", self.author.url().trim_end_matches('/'), self.name)
    }
}

impl<S: FeedSource> std::fmt::Debug for FeedEntry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedEntry")
            .field("name", &self.name)
            .field("author", &self.author.url())
            .field("publish_time", &self.publish_time)
            .field("content", &self.content)
            .field("error", &self.error.as_ref().map(ToString::to_string))
            .finish()
    }
}
