//! Concurrent fetching of followed sites' profiles.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use plume_cache::GetOptions;
use plume_types::Document;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::outcome::FetchOutcome;
use crate::site::ProfileSite;

/// A followed site's profile as seen by one fan-out.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteProfile {
    /// The site URL as recorded in the follow list.
    pub url: String,
    /// `false` only if the fetch timed out.
    pub downloaded: bool,
    /// The fetched profile; empty when the fetch failed.
    pub profile: Document,
}

impl RemoteProfile {
    fn from_outcome(url: &str, outcome: FetchOutcome) -> Self {
        Self {
            url: url.to_string(),
            downloaded: outcome.downloaded(),
            profile: outcome.into_document(),
        }
    }

    /// Whether this profile follows `url`.
    pub fn follows_site(&self, url: &str) -> bool {
        self.profile.follows_site(url)
    }

    /// The profile fields plus `url` and `downloaded`, which take precedence
    /// over same-named profile fields.
    pub fn to_document(&self) -> Document {
        let mut doc = self.profile.clone();
        doc.insert("url", Value::String(self.url.clone()));
        doc.insert("downloaded", Value::Bool(self.downloaded));
        doc
    }
}

impl Serialize for RemoteProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

/// Fetch the profiles of `sites` concurrently, bypassing their caches.
///
/// Results keep the order of `sites`. Never fails: each site's outcome is
/// folded into its [`RemoteProfile`].
pub async fn fetch_remote_profiles(
    sites: &[Arc<ProfileSite>],
    timeout: Option<Duration>,
) -> Vec<RemoteProfile> {
    let opts = GetOptions::fresh(timeout);
    let fetches = sites.iter().map(|site| {
        let opts = &opts;
        async move {
            let outcome = FetchOutcome::classify(site.profile_file().get(opts).await);
            if let FetchOutcome::Unavailable(reason) = &outcome {
                debug!(url = %site.url(), %reason, "remote profile unavailable");
            }
            RemoteProfile::from_outcome(site.url(), outcome)
        }
    });
    let profiles = join_all(fetches).await;
    debug!(
        sites = profiles.len(),
        timed_out = profiles.iter().filter(|p| !p.downloaded).count(),
        "remote profiles fetched"
    );
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_archive::{ArchiveResolver, InMemoryNetwork};
    use serde_json::json;

    fn site(net: &Arc<InMemoryNetwork>, url: &str) -> Arc<ProfileSite> {
        let resolver: Arc<dyn ArchiveResolver> = net.clone();
        Arc::new(ProfileSite::open(url, resolver).unwrap())
    }

    #[tokio::test]
    async fn outcomes_keep_site_order() {
        let net = Arc::new(InMemoryNetwork::new());
        net.archive("dat://bob")
            .unwrap()
            .insert_file("/profile.json", r#"{"name":"bob"}"#)
            .unwrap();
        net.archive("dat://carol").unwrap().set_offline(true);
        let slow = net.archive("dat://dave").unwrap();
        slow.insert_file("/profile.json", "{}").unwrap();
        slow.set_latency(Some(Duration::from_secs(5)));

        let sites = vec![
            site(&net, "dat://bob"),
            site(&net, "dat://carol"),
            site(&net, "dat://dave"),
        ];
        let profiles = fetch_remote_profiles(&sites, Some(Duration::from_millis(30))).await;

        let urls: Vec<&str> = profiles.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["dat://bob", "dat://carol", "dat://dave"]);
        assert!(profiles[0].downloaded);
        assert_eq!(profiles[0].profile.get_str("name"), Some("bob"));
        assert!(profiles[1].downloaded);
        assert!(profiles[1].profile.is_empty());
        assert!(!profiles[2].downloaded);
        assert!(profiles[2].profile.is_empty());
    }

    #[tokio::test]
    async fn fetch_bypasses_cached_profile() {
        let net = Arc::new(InMemoryNetwork::new());
        let bob_archive = net.archive("dat://bob").unwrap();
        bob_archive.insert_file("/profile.json", r#"{"v":1}"#).unwrap();
        let bob = site(&net, "dat://bob");
        assert_eq!(bob.get_profile().await.get("v"), Some(&json!(1)));

        bob_archive.insert_file("/profile.json", r#"{"v":2}"#).unwrap();
        let profiles = fetch_remote_profiles(&[bob], None).await;
        assert_eq!(profiles[0].profile.get("v"), Some(&json!(2)));
    }

    #[test]
    fn serialized_form_flattens_profile() {
        let mut profile = Document::new();
        profile.insert("name", "bob");
        profile.insert("url", "dat://spoofed");
        let remote = RemoteProfile {
            url: "dat://bob".into(),
            downloaded: false,
            profile,
        };
        let value = serde_json::to_value(&remote).unwrap();
        assert_eq!(
            value,
            json!({"name": "bob", "url": "dat://bob", "downloaded": false})
        );
    }
}
