use std::time::Duration;

/// Number of entries returned when no limit (or a limit of `0`) is given.
pub const DEFAULT_FEED_LIMIT: usize = 20;

/// Filtering, ordering and pagination of a feed.
///
/// Bounds are exclusive on both ends. Zero-valued bounds and limits mean
/// "not set": `after: Some(0)` and `before: Some(0)` apply no bound, and
/// `limit: Some(0)` uses [`DEFAULT_FEED_LIMIT`] rather than returning
/// everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedOptions {
    /// Keep entries published strictly after this time (ms).
    pub after: Option<u64>,
    /// Keep entries published strictly before this time (ms).
    pub before: Option<u64>,
    /// Maximum number of entries.
    pub limit: Option<usize>,
    /// Skip reading entry content.
    pub meta_only: bool,
    /// Keep only entries whose content `@type` matches, ignoring case.
    pub type_filter: Option<String>,
    /// Newest first instead of oldest first.
    pub reverse: bool,
    /// Bound on each listing and read.
    pub timeout: Option<Duration>,
}

impl FeedOptions {
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            None | Some(0) => DEFAULT_FEED_LIMIT,
            Some(limit) => limit,
        }
    }

    /// Returns `true` if `publish_time` lies inside the exclusive range.
    pub fn in_range(&self, publish_time: u64) -> bool {
        if let Some(after) = self.after.filter(|&a| a != 0) {
            if publish_time <= after {
                return false;
            }
        }
        if let Some(before) = self.before.filter(|&b| b != 0) {
            if publish_time >= before {
                return false;
            }
        }
        true
    }
}
