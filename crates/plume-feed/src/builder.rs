//! Fan-out listing and merging of broadcasts.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use plume_archive::{within, Archive};
use plume_types::{parse_broadcast_filename, Document, BROADCASTS_DIR};
use tracing::{debug, warn};

use crate::entry::FeedEntry;
use crate::error::FeedError;
use crate::options::FeedOptions;

/// A site whose broadcasts can be listed.
pub trait FeedSource: Send + Sync {
    /// Site identifier used in references and logs.
    fn url(&self) -> &str;

    /// The archive holding the site's broadcasts.
    fn archive(&self) -> &Arc<dyn Archive>;
}

/// Builds feeds from the broadcast directories of a set of sites.
#[derive(Clone, Debug)]
pub struct FeedBuilder {
    dir: String,
}

impl FeedBuilder {
    /// A builder reading the standard `/broadcasts` directory.
    pub fn new() -> Self {
        Self::with_directory(BROADCASTS_DIR)
    }

    /// A builder reading broadcasts from `dir`.
    pub fn with_directory(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn directory(&self) -> &str {
        &self.dir
    }

    /// Build the feed of `sites`.
    ///
    /// 1. List every site's broadcast directory concurrently; failed listings
    ///    contribute nothing.
    /// 2. Keep files named `<digits>.json`, with the digits as publish time.
    /// 3. Apply the exclusive `after`/`before` range.
    /// 4. Sort by publish time (stable, so ties keep site then name order).
    /// 5. Truncate to the effective limit.
    /// 6. Unless `meta_only`, read all surviving entries concurrently.
    /// 7. Apply the `@type` filter to loaded entries.
    pub async fn build<S: FeedSource>(
        &self,
        sites: &[Arc<S>],
        opts: &FeedOptions,
    ) -> Vec<FeedEntry<S>> {
        let listings = join_all(sites.iter().map(|site| self.list_site(site, opts.timeout))).await;

        let mut feed: Vec<FeedEntry<S>> = listings
            .into_iter()
            .flatten()
            .filter(|entry| opts.in_range(entry.publish_time))
            .collect();

        if opts.reverse {
            feed.sort_by(|a, b| b.publish_time.cmp(&a.publish_time));
        } else {
            feed.sort_by_key(|entry| entry.publish_time);
        }
        feed.truncate(opts.effective_limit());

        if opts.meta_only {
            debug!(sites = sites.len(), entries = feed.len(), "feed index built");
            return feed;
        }

        join_all(feed.iter_mut().map(|entry| load_entry(entry, opts.timeout))).await;

        if let Some(type_filter) = &opts.type_filter {
            feed.retain(|entry| {
                entry
                    .content
                    .as_ref()
                    .is_some_and(|content| content.is_type(type_filter))
            });
        }

        debug!(sites = sites.len(), entries = feed.len(), "feed built");
        feed
    }

    /// List one site's broadcasts as metadata-only entries, in file name order.
    async fn list_site<S: FeedSource>(
        &self,
        site: &Arc<S>,
        timeout: Option<Duration>,
    ) -> Vec<FeedEntry<S>> {
        let listing = match within(timeout, &self.dir, site.archive().list_files(&self.dir)).await
        {
            Ok(listing) => listing,
            Err(e) if e.is_not_found() => {
                debug!(url = %site.url(), "site has no broadcasts");
                return Vec::new();
            }
            Err(e) => {
                warn!(url = %site.url(), error = %e, "failed to list broadcasts");
                return Vec::new();
            }
        };

        listing
            .into_iter()
            .filter(|(_, stat)| !stat.is_directory)
            .filter_map(|(name, stat)| {
                let publish_time = parse_broadcast_filename(&name)?;
                Some(FeedEntry::new(stat, Arc::clone(site), publish_time))
            })
            .collect()
    }
}

impl Default for FeedBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Read `entry`'s content, recording a failure on the entry instead of
/// returning it.
async fn load_entry<S: FeedSource>(entry: &mut FeedEntry<S>, timeout: Option<Duration>) {
    match read_document(entry.author.archive().as_ref(), &entry.name, timeout).await {
        Ok(content) => {
            entry.content = Some(content);
            entry.error = None;
        }
        Err(e) => {
            warn!(url = %entry.author.url(), path = %entry.name, error = %e, "failed to read broadcast");
            entry.content = None;
            entry.error = Some(e);
        }
    }
}

/// Read and parse one broadcast document.
pub async fn read_document(
    archive: &dyn Archive,
    path: &str,
    timeout: Option<Duration>,
) -> Result<Document, FeedError> {
    let bytes = within(timeout, path, archive.read_file(path))
        .await
        .map_err(|source| FeedError::Read {
            path: path.to_string(),
            source,
        })?;
    Document::from_slice(&bytes).map_err(|e| FeedError::Parse {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
