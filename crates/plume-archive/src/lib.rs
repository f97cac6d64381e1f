//! Archive access for Plume.
//!
//! Plume never implements replication itself. Every site lives in an
//! *archive*: a peer-replicated file store addressed by a URL such as
//! `dat://<key>`. This crate defines the [`Archive`] trait the rest of Plume
//! talks to, the [`ArchiveResolver`] seam that opens archives by URL, and the
//! timeout wrapper that turns slow peers into a distinct
//! [`ArchiveError::Timeout`].
//!
//! # Backends
//!
//! - [`InMemoryArchive`] / [`InMemoryNetwork`] -- map-based archives with
//!   fault injection, for tests and embedding
//! - [`FsArchive`] / [`FsNetwork`] -- one directory per site on local disk
//!
//! # Design Rules
//!
//! 1. Paths are archive-absolute (`/profile.json`); `..` never escapes the root.
//! 2. Missing files are [`ArchiveError::NotFound`], never an empty read.
//! 3. `create_directory` on an existing directory is [`ArchiveError::AlreadyExists`].
//! 4. Timeouts are applied by callers through [`within`], so every backend
//!    gets the same classification.

pub mod error;
pub mod fs;
pub mod memory;
pub mod timeout;
pub mod traits;

pub use error::{ArchiveError, ArchiveResult};
pub use fs::{FsArchive, FsNetwork};
pub use memory::{InMemoryArchive, InMemoryNetwork};
pub use timeout::within;
pub use traits::{clean_path, Archive, ArchiveResolver, EntryStat};
