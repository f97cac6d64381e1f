use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::trace;

/// Memoizes one site object per URL.
///
/// Keys are the URLs exactly as given; callers normalize first if
/// equivalent spellings should share an entry. Entries are never evicted.
/// No I/O happens here: `open` only wraps an identifier.
pub struct SiteRegistry<S> {
    sites: RwLock<HashMap<String, Arc<S>>>,
}

impl<S> SiteRegistry<S> {
    pub fn new() -> Self {
        Self {
            sites: RwLock::new(HashMap::new()),
        }
    }

    /// The memoized site for `url`, constructing it with `open` on first use.
    ///
    /// If two callers race to construct the same URL, the first insert wins
    /// and both receive it.
    pub fn get_or_open<F, E>(&self, url: &str, open: F) -> Result<Arc<S>, E>
    where
        F: FnOnce(&str) -> Result<S, E>,
    {
        if let Some(site) = self.get(url) {
            return Ok(site);
        }
        let site = Arc::new(open(url)?);
        let mut sites = self.sites.write().expect("registry lock poisoned");
        let entry = sites.entry(url.to_string()).or_insert(site);
        trace!(url, "site registered");
        Ok(Arc::clone(entry))
    }

    /// Resolve a sequence of URLs to sites, preserving order.
    ///
    /// Stops at the first construction failure.
    pub fn resolve<I, U, F, E>(&self, urls: I, mut open: F) -> Result<Vec<Arc<S>>, E>
    where
        I: IntoIterator<Item = U>,
        U: AsRef<str>,
        F: FnMut(&str) -> Result<S, E>,
    {
        urls.into_iter()
            .map(|url| self.get_or_open(url.as_ref(), &mut open))
            .collect()
    }

    /// The memoized site for `url`, if any.
    pub fn get(&self, url: &str) -> Option<Arc<S>> {
        self.sites
            .read()
            .expect("registry lock poisoned")
            .get(url)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sites.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of registered URLs.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .sites
            .read()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        urls.sort();
        urls
    }
}

impl<S> Default for SiteRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for SiteRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteRegistry")
            .field("site_count", &self.len())
            .finish()
    }
}
