//! Feed construction for Plume.
//!
//! A feed is the broadcasts of a set of sites merged into one time-ordered
//! sequence. [`FeedBuilder`] lists every site's `/broadcasts` directory
//! concurrently, derives each entry's publish time from its file name,
//! filters and paginates, and finally reads the surviving entries' content.
//!
//! Sites that cannot be listed contribute nothing; entries that cannot be read
//! carry a [`FeedError`] instead of content. Building a feed never fails as a
//! whole.

pub mod builder;
pub mod entry;
pub mod error;
pub mod options;

pub use builder::{read_document, FeedBuilder, FeedSource};
pub use entry::FeedEntry;
pub use error::FeedError;
pub use options::{FeedOptions, DEFAULT_FEED_LIMIT};
