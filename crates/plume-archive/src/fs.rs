use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use plume_types::normalize_url;
use tracing::debug;

use crate::error::{ArchiveError, ArchiveResult};
use crate::traits::{clean_path, split_parent, Archive, ArchiveResolver, EntryStat};

/// An archive stored as a plain directory on local disk.
///
/// The root directory is created on the first write. Reads from a site that
/// has never been written fail with [`ArchiveError::NotFound`].
pub struct FsArchive {
    url: String,
    root: PathBuf,
}

impl FsArchive {
    pub fn new(url: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            root: root.into(),
        }
    }

    /// Directory backing this archive.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an archive path to a filesystem path, returning both forms.
    fn locate(&self, path: &str) -> ArchiveResult<(String, PathBuf)> {
        let clean = clean_path(path)?;
        let mut full = self.root.clone();
        full.extend(clean.split('/').filter(|p| !p.is_empty()));
        Ok((clean, full))
    }

    async fn ensure_root(&self) -> ArchiveResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }
}

#[async_trait]
impl Archive for FsArchive {
    fn url(&self) -> &str {
        &self.url
    }

    async fn read_file(&self, path: &str) -> ArchiveResult<Vec<u8>> {
        let (clean, full) = self.locate(path)?;
        tokio::fs::read(&full).await.map_err(|e| map_io(e, clean))
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> ArchiveResult<()> {
        let (clean, full) = self.locate(path)?;
        let (parent, name) = split_parent(&clean);
        if name.is_empty() {
            return Err(ArchiveError::InvalidPath(clean));
        }
        self.ensure_root().await?;
        let (_, parent_full) = self.locate(parent)?;
        match tokio::fs::metadata(&parent_full).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ArchiveError::InvalidPath(format!("{parent} is not a directory"))),
            Err(e) => return Err(map_io(e, parent.to_string())),
        }
        tokio::fs::write(&full, data)
            .await
            .map_err(|e| map_io(e, clean.clone()))?;
        debug!(url = %self.url, path = %clean, bytes = data.len(), "file written");
        Ok(())
    }

    async fn stat(&self, path: &str) -> ArchiveResult<EntryStat> {
        let (clean, full) = self.locate(path)?;
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| map_io(e, clean.clone()))?;
        Ok(stat_of(clean, &meta))
    }

    async fn list_files(&self, dir: &str) -> ArchiveResult<BTreeMap<String, EntryStat>> {
        let (clean, full) = self.locate(dir)?;
        let mut reader = tokio::fs::read_dir(&full)
            .await
            .map_err(|e| map_io(e, clean.clone()))?;
        let mut listing = BTreeMap::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata().await?;
            let path = if clean == "/" {
                format!("/{name}")
            } else {
                format!("{clean}/{name}")
            };
            listing.insert(name, stat_of(path, &meta));
        }
        Ok(listing)
    }

    async fn create_directory(&self, path: &str) -> ArchiveResult<()> {
        let (clean, full) = self.locate(path)?;
        if clean == "/" {
            return Err(ArchiveError::AlreadyExists(clean));
        }
        self.ensure_root().await?;
        tokio::fs::create_dir(&full)
            .await
            .map_err(|e| map_io(e, clean))
    }
}

impl std::fmt::Debug for FsArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsArchive")
            .field("url", &self.url)
            .field("root", &self.root)
            .finish()
    }
}

/// Opens sites as directories beneath a shared root: `dat://<host>` lives in
/// `<root>/<host>`.
#[derive(Clone, Debug)]
pub struct FsNetwork {
    root: PathBuf,
}

impl FsNetwork {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open the archive for `url` with its concrete type.
    pub fn archive(&self, url: &str) -> ArchiveResult<FsArchive> {
        let site = normalize_url(url).ok_or_else(|| ArchiveError::InvalidUrl(url.to_string()))?;
        let host = site.split_once("://").map(|(_, h)| h).unwrap_or_default();
        if host == "." || host == ".." || host.contains(['\\', ':']) {
            return Err(ArchiveError::InvalidUrl(url.to_string()));
        }
        Ok(FsArchive::new(site, self.root.join(host)))
    }
}

impl ArchiveResolver for FsNetwork {
    fn open(&self, url: &str) -> ArchiveResult<Arc<dyn Archive>> {
        Ok(Arc::new(self.archive(url)?))
    }
}

fn map_io(err: std::io::Error, path: String) -> ArchiveError {
    match err.kind() {
        ErrorKind::NotFound => ArchiveError::NotFound(path),
        ErrorKind::AlreadyExists => ArchiveError::AlreadyExists(path),
        _ => ArchiveError::Io(err),
    }
}

fn stat_of(name: String, meta: &std::fs::Metadata) -> EntryStat {
    let modified_ms = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64);
    EntryStat {
        name,
        size: if meta.is_dir() { 0 } else { meta.len() },
        is_directory: meta.is_dir(),
        modified_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_network() -> (tempfile::TempDir, FsNetwork) {
        let dir = tempfile::tempdir().unwrap();
        let net = FsNetwork::new(dir.path());
        (dir, net)
    }

    #[tokio::test]
    async fn write_read_roundtrip_on_disk() {
        let (dir, net) = temp_network();
        let archive = net.archive("dat://alice/").unwrap();
        archive.write_file("/profile.json", b"{\"a\":1}").await.unwrap();

        assert_eq!(archive.read_file("/profile.json").await.unwrap(), b"{\"a\":1}");
        assert!(dir.path().join("alice").join("profile.json").exists());
        assert_eq!(archive.url(), "dat://alice");
    }

    #[tokio::test]
    async fn unwritten_site_reads_not_found() {
        let (_dir, net) = temp_network();
        let archive = net.archive("dat://nobody").unwrap();
        assert!(archive.read_file("/profile.json").await.unwrap_err().is_not_found());
        assert!(archive.list_files("/broadcasts").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn directories_and_listing() {
        let (_dir, net) = temp_network();
        let archive = net.archive("dat://alice").unwrap();
        assert!(archive
            .write_file("/broadcasts/1.json", b"{}")
            .await
            .unwrap_err()
            .is_not_found());

        archive.create_directory("/broadcasts").await.unwrap();
        assert!(archive
            .create_directory("/broadcasts")
            .await
            .unwrap_err()
            .is_already_exists());

        archive.write_file("/broadcasts/2.json", b"{}").await.unwrap();
        archive.write_file("/broadcasts/1.json", b"{ }").await.unwrap();
        let listing = archive.list_files("/broadcasts").await.unwrap();
        let names: Vec<&str> = listing.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["1.json", "2.json"]);
        assert_eq!(listing["1.json"].name, "/broadcasts/1.json");
        assert_eq!(listing["1.json"].size, 3);

        let stat = archive.stat("/broadcasts/2.json").await.unwrap();
        assert_eq!(stat.size, 2);
        assert!(stat.modified_ms.is_some());
    }

    #[tokio::test]
    async fn escaping_paths_rejected() {
        let (_dir, net) = temp_network();
        let archive = net.archive("dat://alice").unwrap();
        let err = archive.write_file("/../bob/profile.json", b"{}").await.unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidPath(_)));
    }

    #[test]
    fn network_rejects_unsafe_hosts() {
        let net = FsNetwork::new("/tmp/plume");
        assert!(net.archive("dat://..").is_err());
        assert!(net.archive("not a url").is_err());
        let archive = net.archive("dat://alice/profile.json").unwrap();
        assert_eq!(archive.root(), Path::new("/tmp/plume/alice"));
    }
}
