use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use plume_types::normalize_url;

use crate::error::{ArchiveError, ArchiveResult};
use crate::traits::{clean_path, split_parent, Archive, ArchiveResolver, EntryStat};

/// A stored entry: file bytes, or `None` for a directory.
#[derive(Clone)]
struct Node {
    data: Option<Vec<u8>>,
    modified_ms: u64,
}

/// Injected failure modes.
#[derive(Clone, Default)]
struct Faults {
    offline: bool,
    latency: Option<Duration>,
    failing_listings: bool,
}

/// In-memory, map-based archive.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock` and
/// cloned on read. Fault injection ([`set_offline`](Self::set_offline),
/// [`set_latency`](Self::set_latency),
/// [`set_listing_fails`](Self::set_listing_fails)) simulates unreachable or
/// slow peers.
pub struct InMemoryArchive {
    url: String,
    entries: RwLock<BTreeMap<String, Node>>,
    faults: RwLock<Faults>,
}

impl InMemoryArchive {
    /// Create an empty archive with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            entries: RwLock::new(BTreeMap::new()),
            faults: RwLock::new(Faults::default()),
        }
    }

    /// Store a file directly, creating missing parent directories.
    ///
    /// Bypasses fault injection; meant for seeding test fixtures.
    pub fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) -> ArchiveResult<()> {
        let path = clean_path(path)?;
        let mut entries = self.entries.write().expect("lock poisoned");
        for dir in plume_types::parent_directories(&path) {
            entries.entry(dir).or_insert_with(|| Node {
                data: None,
                modified_ms: now_ms(),
            });
        }
        entries.insert(
            path,
            Node {
                data: Some(data.into()),
                modified_ms: now_ms(),
            },
        );
        Ok(())
    }

    /// Contents of a file, bypassing fault injection.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        let path = clean_path(path).ok()?;
        let entries = self.entries.read().expect("lock poisoned");
        entries.get(&path).and_then(|node| node.data.clone())
    }

    /// Make every operation fail with [`ArchiveError::Unreachable`].
    pub fn set_offline(&self, offline: bool) {
        self.faults.write().expect("lock poisoned").offline = offline;
    }

    /// Delay every operation by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults.write().expect("lock poisoned").latency = latency;
    }

    /// Make `list_files` fail while other operations keep working.
    pub fn set_listing_fails(&self, fails: bool) {
        self.faults.write().expect("lock poisoned").failing_listings = fails;
    }

    /// Number of entries (files and directories).
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Sorted paths of all files.
    pub fn file_paths(&self) -> Vec<String> {
        self.entries
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|(_, node)| node.data.is_some())
            .map(|(path, _)| path.clone())
            .collect()
    }

    async fn simulate(&self) -> ArchiveResult<()> {
        let faults = self.faults.read().expect("lock poisoned").clone();
        if let Some(latency) = faults.latency {
            tokio::time::sleep(latency).await;
        }
        if faults.offline {
            return Err(ArchiveError::Unreachable(self.url.clone()));
        }
        Ok(())
    }

    fn is_directory(entries: &BTreeMap<String, Node>, path: &str) -> bool {
        path == "/" || entries.get(path).is_some_and(|node| node.data.is_none())
    }
}

#[async_trait]
impl Archive for InMemoryArchive {
    fn url(&self) -> &str {
        &self.url
    }

    async fn read_file(&self, path: &str) -> ArchiveResult<Vec<u8>> {
        self.simulate().await?;
        let path = clean_path(path)?;
        let entries = self.entries.read().expect("lock poisoned");
        match entries.get(&path) {
            Some(Node { data: Some(data), .. }) => Ok(data.clone()),
            Some(_) => Err(ArchiveError::InvalidPath(format!("{path} is a directory"))),
            None => Err(ArchiveError::NotFound(path)),
        }
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> ArchiveResult<()> {
        self.simulate().await?;
        let path = clean_path(path)?;
        let (parent, name) = split_parent(&path);
        if name.is_empty() {
            return Err(ArchiveError::InvalidPath(path));
        }
        let mut entries = self.entries.write().expect("lock poisoned");
        if !Self::is_directory(&entries, parent) {
            return Err(ArchiveError::NotFound(parent.to_string()));
        }
        if Self::is_directory(&entries, &path) {
            return Err(ArchiveError::InvalidPath(format!("{path} is a directory")));
        }
        entries.insert(
            path,
            Node {
                data: Some(data.to_vec()),
                modified_ms: now_ms(),
            },
        );
        Ok(())
    }

    async fn stat(&self, path: &str) -> ArchiveResult<EntryStat> {
        self.simulate().await?;
        let path = clean_path(path)?;
        if path == "/" {
            return Ok(EntryStat {
                name: path,
                size: 0,
                is_directory: true,
                modified_ms: None,
            });
        }
        let entries = self.entries.read().expect("lock poisoned");
        let node = entries
            .get(&path)
            .ok_or_else(|| ArchiveError::NotFound(path.clone()))?;
        Ok(stat_of(path.clone(), node))
    }

    async fn list_files(&self, dir: &str) -> ArchiveResult<BTreeMap<String, EntryStat>> {
        self.simulate().await?;
        if self.faults.read().expect("lock poisoned").failing_listings {
            return Err(ArchiveError::Unreachable(format!("{} (listing)", self.url)));
        }
        let dir = clean_path(dir)?;
        let entries = self.entries.read().expect("lock poisoned");
        if !Self::is_directory(&entries, &dir) {
            return Err(ArchiveError::NotFound(dir));
        }
        let prefix = if dir == "/" { "/".to_string() } else { format!("{dir}/") };
        let children = entries
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, node)| {
                let name = &path[prefix.len()..];
                (!name.contains('/')).then(|| (name.to_string(), stat_of(path.clone(), node)))
            })
            .collect();
        Ok(children)
    }

    async fn create_directory(&self, path: &str) -> ArchiveResult<()> {
        self.simulate().await?;
        let path = clean_path(path)?;
        let mut entries = self.entries.write().expect("lock poisoned");
        if path == "/" || entries.contains_key(&path) {
            return Err(ArchiveError::AlreadyExists(path));
        }
        let (parent, _) = split_parent(&path);
        if !Self::is_directory(&entries, parent) {
            return Err(ArchiveError::NotFound(parent.to_string()));
        }
        entries.insert(
            path,
            Node {
                data: None,
                modified_ms: now_ms(),
            },
        );
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryArchive")
            .field("url", &self.url)
            .field("entry_count", &self.len())
            .finish()
    }
}

/// A set of in-memory archives addressable by site URL.
///
/// Opening an unknown URL creates an empty archive for it, the way joining a
/// swarm with no peers yields an archive whose reads all miss.
#[derive(Default)]
pub struct InMemoryNetwork {
    archives: RwLock<HashMap<String, Arc<InMemoryArchive>>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// The archive for `url`, creating it if needed.
    pub fn archive(&self, url: &str) -> ArchiveResult<Arc<InMemoryArchive>> {
        let key = normalize_url(url).ok_or_else(|| ArchiveError::InvalidUrl(url.to_string()))?;
        let mut archives = self.archives.write().expect("lock poisoned");
        let archive = archives
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(InMemoryArchive::new(key)));
        Ok(Arc::clone(archive))
    }

    /// Number of archives opened or created so far.
    pub fn len(&self) -> usize {
        self.archives.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArchiveResolver for InMemoryNetwork {
    fn open(&self, url: &str) -> ArchiveResult<Arc<dyn Archive>> {
        let archive: Arc<dyn Archive> = self.archive(url)?;
        Ok(archive)
    }
}

fn stat_of(name: String, node: &Node) -> EntryStat {
    EntryStat {
        name,
        size: node.data.as_ref().map_or(0, |d| d.len() as u64),
        is_directory: node.data.is_none(),
        modified_ms: Some(node.modified_ms),
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
