//! Foundation types for Plume.
//!
//! Plume is a social-profile layer over peer-replicated file archives. Each
//! site owns an archive holding a `/profile.json` document and a
//! `/broadcasts/` directory of timestamped posts. Every other Plume crate
//! depends on `plume-types`.
//!
//! # Key Types
//!
//! - [`SiteUrl`] -- Normalized `scheme://host` site identity
//! - [`Document`] -- Schema-free JSON object with typed accessors
//! - [`FollowRecord`] -- One entry of a profile's `follows` list
//! - [`BroadcastDraft`] -- Fields of a post before it is written
//! - [`BroadcastClock`] -- Per-site monotonic timestamp source for post names

pub mod broadcast;
pub mod document;
pub mod error;
pub mod naming;
pub mod url;

pub use broadcast::{BroadcastDraft, COMMENT_TYPE, SCHEMA_CONTEXT};
pub use document::{Document, FollowRecord};
pub use error::{Result, TypeError};
pub use naming::{
    broadcast_path, parent_directories, parse_broadcast_filename, BroadcastClock,
    BROADCASTS_DIR, PROFILE_PATH,
};
pub use url::{normalize_url, same_site, SiteUrl};
