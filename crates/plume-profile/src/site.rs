use std::sync::Arc;
use std::time::Duration;

use plume_archive::{Archive, ArchiveResolver};
use plume_cache::{CachedFile, FileContents, FileFormat, GetOptions, SiteRegistry};
use plume_feed::{read_document, FeedBuilder, FeedEntry, FeedOptions, FeedSource};
use plume_types::{
    normalize_url, parent_directories, parse_broadcast_filename, same_site, BroadcastClock,
    BroadcastDraft, Document, SiteUrl, TypeError, PROFILE_PATH,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProfileError, ProfileResult};
use crate::outcome::own_profile;
use crate::remote::{fetch_remote_profiles, RemoteProfile};

/// A broadcast in a feed built by a [`ProfileSite`].
pub type Broadcast = FeedEntry<ProfileSite>;

/// What [`ProfileSite::get_broadcast`] should load.
#[derive(Debug)]
pub enum BroadcastTarget {
    /// A path in this site's archive, or a full `<site url>/broadcasts/...`
    /// reference to this site.
    Path(String),
    /// An entry from a previously built feed; read from its author's archive.
    Entry(Broadcast),
}

impl From<&str> for BroadcastTarget {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for BroadcastTarget {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Broadcast> for BroadcastTarget {
    fn from(entry: Broadcast) -> Self {
        Self::Entry(entry)
    }
}

/// One participant's view of the social layer.
///
/// Wraps the site's archive with a cached `/profile.json`, a registry of the
/// sites it follows, and the site's process-wide broadcast clock, so handles
/// opened separately on one site never pick the same broadcast name.
/// Mutations on one
/// instance are serialized; writers in other processes still race with
/// last-write-wins.
pub struct ProfileSite {
    url: String,
    archive: Arc<dyn Archive>,
    resolver: Arc<dyn ArchiveResolver>,
    profile: CachedFile,
    following: SiteRegistry<ProfileSite>,
    clock: Arc<BroadcastClock>,
    feed: FeedBuilder,
    mutation: Mutex<()>,
}

impl ProfileSite {
    /// Open the site at `url` through `resolver`.
    ///
    /// No I/O happens here; an unreachable site opens fine and fails later.
    pub fn open(url: &str, resolver: Arc<dyn ArchiveResolver>) -> ProfileResult<Self> {
        if url.trim().is_empty() {
            return Err(ProfileError::MissingParameter("url"));
        }
        let archive = resolver.open(url)?;
        Ok(Self::assemble(url.to_string(), archive, resolver))
    }

    /// Wrap an already opened archive. Followed sites are opened through
    /// `resolver`.
    pub fn from_archive(
        archive: Arc<dyn Archive>,
        resolver: Arc<dyn ArchiveResolver>,
    ) -> ProfileResult<Self> {
        let url = archive.url().to_string();
        if url.trim().is_empty() {
            return Err(ProfileError::MissingParameter("archive url"));
        }
        Ok(Self::assemble(url, archive, resolver))
    }

    fn assemble(url: String, archive: Arc<dyn Archive>, resolver: Arc<dyn ArchiveResolver>) -> Self {
        let profile = CachedFile::new(Arc::clone(&archive), PROFILE_PATH, FileFormat::Json);
        let clock = BroadcastClock::for_site(&url);
        Self {
            url,
            archive,
            resolver,
            profile,
            following: SiteRegistry::new(),
            clock,
            feed: FeedBuilder::new(),
            mutation: Mutex::new(()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn archive(&self) -> &Arc<dyn Archive> {
        &self.archive
    }

    /// URLs of the followed sites opened so far.
    pub fn known_sites(&self) -> Vec<String> {
        self.following.urls()
    }

    pub(crate) fn profile_file(&self) -> &CachedFile {
        &self.profile
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// The site's profile. Missing or unreadable profiles read as empty.
    pub async fn get_profile(&self) -> Document {
        own_profile(self.profile.get(&GetOptions::default()).await, &self.url)
    }

    /// Shallow-merge `updates` into the profile and persist it.
    pub async fn set_profile(&self, updates: Document) -> ProfileResult<()> {
        let _guard = self.mutation.lock().await;
        let mut profile = self.get_profile().await;
        let fields = updates.len();
        profile.merge(updates);
        self.save_profile(profile).await?;
        info!(url = %self.url, fields, "profile updated");
        Ok(())
    }

    async fn save_profile(&self, profile: Document) -> ProfileResult<()> {
        self.profile
            .put(FileContents::Json(profile.into_value()))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    /// Add `url` to the follow list. Following an already followed site
    /// leaves the list unchanged.
    pub async fn follow(&self, url: &str) -> ProfileResult<()> {
        let target = SiteUrl::parse(url)?;
        let _guard = self.mutation.lock().await;
        let mut profile = self.get_profile().await;
        let added = profile.add_follow(&target);
        self.save_profile(profile).await?;
        info!(url = %self.url, target = %target, added, "follow");
        Ok(())
    }

    /// Remove every follow record for the same site as `url`.
    ///
    /// A `url` that does not normalize removes records holding exactly that
    /// text, so malformed records written by other clients can be dropped.
    pub async fn unfollow(&self, url: &str) -> ProfileResult<()> {
        let target = match SiteUrl::parse(url) {
            Ok(site) => site.to_string(),
            Err(TypeError::InvalidSiteUrl(_)) => url.trim().to_string(),
            Err(e) => return Err(e.into()),
        };
        let _guard = self.mutation.lock().await;
        let mut profile = self.get_profile().await;
        let removed = profile.remove_follow(&target);
        self.save_profile(profile).await?;
        info!(url = %self.url, target = %target, removed, "unfollow");
        Ok(())
    }

    /// Whether the follow list contains `url`.
    pub async fn is_following(&self, url: &str) -> bool {
        self.get_profile().await.follows_site(url)
    }

    /// Followed sites, in follow-list order, opened through the registry.
    ///
    /// Records that cannot be opened are skipped with a warning.
    async fn followed_sites(&self) -> Vec<Arc<ProfileSite>> {
        let urls: Vec<String> = self
            .get_profile()
            .await
            .follows()
            .into_iter()
            .map(|record| record.url)
            .filter(|url| {
                let valid = normalize_url(url).is_some();
                if !valid {
                    warn!(url = %self.url, follow = %url, "skipping malformed follow record");
                }
                valid
            })
            .collect();

        let resolved = self
            .following
            .resolve(&urls, |url| ProfileSite::open(url, Arc::clone(&self.resolver)));
        match resolved {
            Ok(sites) => sites,
            Err(e) => {
                warn!(url = %self.url, error = %e, "some followed sites cannot be opened");
                urls.iter()
                    .filter_map(|follow| match self.open_followed(follow) {
                        Ok(site) => Some(site),
                        Err(e) => {
                            warn!(url = %self.url, follow = %follow, error = %e, "skipping follow record");
                            None
                        }
                    })
                    .collect()
            }
        }
    }

    fn open_followed(&self, url: &str) -> ProfileResult<Arc<ProfileSite>> {
        self.following
            .get_or_open(url, |url| ProfileSite::open(url, Arc::clone(&self.resolver)))
    }

    /// Profiles of every followed site, fetched concurrently.
    pub async fn list_following(&self, timeout: Option<Duration>) -> Vec<RemoteProfile> {
        let sites = self.followed_sites().await;
        fetch_remote_profiles(&sites, timeout).await
    }

    /// Followed sites whose own follow list contains this site.
    pub async fn list_friends(&self, timeout: Option<Duration>) -> Vec<RemoteProfile> {
        let mut profiles = self.list_following(timeout).await;
        profiles.retain(|profile| profile.follows_site(&self.url));
        profiles
    }

    /// The followers this site can know about: the mutual follows.
    pub async fn list_known_followers(&self, timeout: Option<Duration>) -> Vec<RemoteProfile> {
        self.list_friends(timeout).await
    }

    /// Whether this site follows `url` and `url` follows back.
    ///
    /// Any failure to fetch the remote profile reads as `false`.
    pub async fn is_friends_with(&self, url: &str, timeout: Option<Duration>) -> bool {
        let profile = self.get_profile().await;
        let Some(record) = profile
            .follows()
            .into_iter()
            .find(|record| same_site(&record.url, url))
        else {
            return false;
        };
        let site = match self.open_followed(&record.url) {
            Ok(site) => site,
            Err(e) => {
                debug!(url = %self.url, target = %record.url, error = %e, "cannot open followed site");
                return false;
            }
        };
        fetch_remote_profiles(&[site], timeout)
            .await
            .first()
            .is_some_and(|remote| remote.follows_site(&self.url))
    }

    // =========================================================================
    // Broadcasts
    // =========================================================================

    /// Publish a broadcast and return its full reference.
    pub async fn broadcast(&self, draft: &BroadcastDraft) -> ProfileResult<String> {
        let doc = draft.to_document();
        let path = self.clock.next_path();
        self.ensure_parent_directories(&path).await;
        let bytes = doc.to_pretty_json()?;
        self.archive.write_file(&path, &bytes).await?;
        let reference = self.reference(&path);
        info!(url = %self.url, path = %path, "broadcast published");
        Ok(reference)
    }

    async fn ensure_parent_directories(&self, path: &str) {
        for dir in parent_directories(path) {
            match self.archive.create_directory(&dir).await {
                Ok(()) => debug!(url = %self.url, dir = %dir, "directory created"),
                Err(e) if e.is_already_exists() => {
                    debug!(url = %self.url, dir = %dir, "directory exists")
                }
                // The write that follows reports the real failure.
                Err(e) => debug!(url = %self.url, dir = %dir, error = %e, "create directory failed"),
            }
        }
    }

    fn reference(&self, path: &str) -> String {
        match SiteUrl::parse(&self.url) {
            Ok(site) => site.join(path),
            Err(_) => format!("{}{}", self.url.trim_end_matches('/'), path),
        }
    }

    /// This site's broadcasts.
    pub async fn list_broadcasts(self: &Arc<Self>, opts: &FeedOptions) -> Vec<Broadcast> {
        self.feed.build(&[Arc::clone(self)], opts).await
    }

    /// Broadcasts of this site and every followed site, merged.
    pub async fn list_feed(self: &Arc<Self>, opts: &FeedOptions) -> Vec<Broadcast> {
        let mut sites = vec![Arc::clone(self)];
        sites.extend(self.followed_sites().await);
        self.feed.build(&sites, opts).await
    }

    /// Load one broadcast with its content.
    ///
    /// Unlike feeds, read and parse failures propagate.
    pub async fn get_broadcast(
        self: &Arc<Self>,
        target: impl Into<BroadcastTarget>,
    ) -> ProfileResult<Broadcast> {
        match target.into() {
            BroadcastTarget::Path(path) => {
                let path = self.local_path(&path)?;
                let publish_time = parse_broadcast_filename(&path)
                    .ok_or_else(|| ProfileError::InvalidBroadcastPath(path.clone()))?;
                let stat = self.archive.stat(&path).await?;
                let mut entry = FeedEntry::new(stat, Arc::clone(self), publish_time);
                entry.content = Some(read_document(self.archive.as_ref(), &entry.name, None).await?);
                Ok(entry)
            }
            BroadcastTarget::Entry(mut entry) => {
                let content = read_document(entry.author.archive().as_ref(), &entry.name, None).await?;
                entry.content = Some(content);
                entry.error = None;
                Ok(entry)
            }
        }
    }

    /// Strip this site's URL from a full reference.
    fn local_path(&self, target: &str) -> ProfileResult<String> {
        let Some((_, rest)) = target.split_once("://") else {
            return Ok(target.to_string());
        };
        if !same_site(target, &self.url) {
            return Err(ProfileError::InvalidBroadcastPath(target.to_string()));
        }
        let path = rest.find('/').map_or("/", |at| &rest[at..]);
        debug!(url = %self.url, reference = %target, path, "resolved reference");
        Ok(path.to_string())
    }
}

impl FeedSource for ProfileSite {
    fn url(&self) -> &str {
        &self.url
    }

    fn archive(&self) -> &Arc<dyn Archive> {
        &self.archive
    }
}

impl std::fmt::Debug for ProfileSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileSite")
            .field("url", &self.url)
            .field("normalized", &normalize_url(&self.url))
            .field("known_sites", &self.following.len())
            .field("last_broadcast", &self.clock.last())
            .finish()
    }
}
