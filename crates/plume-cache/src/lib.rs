//! Caching layer for Plume.
//!
//! - [`CachedFile`] mirrors one archive file in memory, parsing JSON on read
//!   and writing through on update.
//! - [`SiteRegistry`] memoizes one site object per URL so repeated graph
//!   traversals share caches instead of re-fetching.
//!
//! Neither type coordinates concurrent writers: two `put`s racing on the same
//! file resolve last-write-wins.

pub mod cached_file;
pub mod error;
pub mod registry;

pub use cached_file::{CachedFile, FileContents, FileFormat, GetOptions};
pub use error::{CacheError, CacheResult};
pub use registry::SiteRegistry;
