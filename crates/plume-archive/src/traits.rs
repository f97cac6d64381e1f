//! The [`Archive`] and [`ArchiveResolver`] traits.
//!
//! Any backend (in-memory, local directory, a real peer-to-peer archive)
//! implements [`Archive`] to expose its file primitives to Plume.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, ArchiveResult};

/// Metadata about one archive entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStat {
    /// Archive-absolute path of the entry (e.g. `/broadcasts/1.json`).
    pub name: String,
    /// Size in bytes; `0` for directories.
    pub size: u64,
    pub is_directory: bool,
    /// Last modification time in milliseconds since the UNIX epoch, if known.
    pub modified_ms: Option<u64>,
}

/// File primitives of a site archive.
///
/// Implementations must be thread-safe (`Send + Sync`). All paths are
/// archive-absolute.
#[async_trait]
pub trait Archive: Send + Sync {
    /// Stable URL identifying this archive (`scheme://host`).
    fn url(&self) -> &str;

    /// Read a whole file.
    ///
    /// Fails with [`ArchiveError::NotFound`] if the path does not exist.
    async fn read_file(&self, path: &str) -> ArchiveResult<Vec<u8>>;

    /// Create or overwrite a file. The parent directory must exist.
    async fn write_file(&self, path: &str, data: &[u8]) -> ArchiveResult<()>;

    /// Metadata for a single path.
    async fn stat(&self, path: &str) -> ArchiveResult<EntryStat>;

    /// List the direct children of a directory, keyed by file name.
    async fn list_files(&self, dir: &str) -> ArchiveResult<BTreeMap<String, EntryStat>>;

    /// Create a single directory. Fails with [`ArchiveError::AlreadyExists`]
    /// if it exists.
    async fn create_directory(&self, path: &str) -> ArchiveResult<()>;
}

/// Opens archives by site URL.
///
/// Opening only wraps the identifier; no I/O happens until the archive is
/// used, so opening an unreachable site succeeds and later reads fail.
pub trait ArchiveResolver: Send + Sync {
    fn open(&self, url: &str) -> ArchiveResult<Arc<dyn Archive>>;
}

/// Canonicalize an archive path: leading `/`, no empty or `.` components.
///
/// `..` components are rejected rather than resolved.
pub fn clean_path(path: &str) -> ArchiveResult<String> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(ArchiveError::InvalidPath(path.to_string())),
            part => parts.push(part),
        }
    }
    Ok(format!("/{}", parts.join("/")))
}

/// Split a clean path into its parent directory and file name.
pub(crate) fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("/", path),
    }
}
