//! Profile sites for Plume.
//!
//! A [`ProfileSite`] is one participant's view of the social layer: it reads
//! and updates the site's `/profile.json`, maintains the `follows` list,
//! publishes broadcasts, and builds feeds across the site and everyone it
//! follows. This is the main entry point for applications embedding Plume.
//!
//! Remote reads are lenient. Unreachable or malformed remote profiles
//! degrade to empty results (see [`FetchOutcome`]) so that one bad peer never
//! takes a feed down.

pub mod error;
pub mod outcome;
pub mod remote;
pub mod site;

pub use error::{ProfileError, ProfileResult};
pub use outcome::FetchOutcome;
pub use remote::{fetch_remote_profiles, RemoteProfile};
pub use site::{Broadcast, BroadcastTarget, ProfileSite};

// Re-export key types
pub use plume_archive::{Archive, ArchiveResolver, EntryStat, FsNetwork, InMemoryNetwork};
pub use plume_feed::{FeedEntry, FeedOptions, DEFAULT_FEED_LIMIT};
pub use plume_types::{BroadcastDraft, Document, FollowRecord, SiteUrl};
