use std::sync::{Arc, RwLock};
use std::time::Duration;

use plume_archive::{within, Archive};
use serde_json::Value;
use tracing::debug;

use crate::error::{CacheError, CacheResult};

/// How a cached file's bytes are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    /// Parse as JSON on read, serialize as pretty JSON on write.
    Json,
    /// Keep the raw bytes.
    Raw,
}

/// Contents of a cached file.
#[derive(Clone, Debug, PartialEq)]
pub enum FileContents {
    Json(Value),
    Raw(Vec<u8>),
}

impl FileContents {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::Json(_) => None,
        }
    }
}

/// Options for [`CachedFile::get`].
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    /// Ignore the cached value and re-read the file.
    pub bypass_cache: bool,
    /// Give up on the read after this long.
    pub timeout: Option<Duration>,
}

impl GetOptions {
    /// Options that force a re-read bounded by `timeout`.
    pub fn fresh(timeout: Option<Duration>) -> Self {
        Self {
            bypass_cache: true,
            timeout,
        }
    }
}

/// A single archive file mirrored in memory.
///
/// The cache is empty until the first successful read or any write, and is
/// replaced only by a bypassing read, a [`put`](Self::put), or
/// [`invalidate`](Self::invalidate).
pub struct CachedFile {
    archive: Arc<dyn Archive>,
    path: String,
    format: FileFormat,
    fallback: Option<FileContents>,
    contents: RwLock<Option<FileContents>>,
}

impl CachedFile {
    pub fn new(archive: Arc<dyn Archive>, path: impl Into<String>, format: FileFormat) -> Self {
        Self {
            archive,
            path: path.into(),
            format,
            fallback: None,
            contents: RwLock::new(None),
        }
    }

    /// Value returned (but not cached) when the file is missing or empty.
    pub fn with_fallback(mut self, fallback: FileContents) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn archive(&self) -> &Arc<dyn Archive> {
        &self.archive
    }

    /// The cached value, without touching the archive.
    pub fn peek(&self) -> Option<FileContents> {
        self.contents.read().expect("cache lock poisoned").clone()
    }

    /// Drop the cached value so the next `get` re-reads the file.
    pub fn invalidate(&self) {
        *self.contents.write().expect("cache lock poisoned") = None;
    }

    /// Return the cached value, reading and parsing the file on a miss.
    ///
    /// A missing or empty file yields the fallback when one is configured;
    /// otherwise read and parse failures propagate.
    pub async fn get(&self, opts: &GetOptions) -> CacheResult<FileContents> {
        if !opts.bypass_cache {
            if let Some(contents) = self.peek() {
                return Ok(contents);
            }
        }

        let read = within(opts.timeout, &self.path, self.archive.read_file(&self.path)).await;
        let bytes = match read {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                if let Some(fallback) = &self.fallback {
                    debug!(url = %self.archive.url(), path = %self.path, "file missing, using fallback");
                    return Ok(fallback.clone());
                }
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            if let Some(fallback) = &self.fallback {
                return Ok(fallback.clone());
            }
        }

        let contents = match self.format {
            FileFormat::Json => {
                let value = serde_json::from_slice(&bytes).map_err(|source| CacheError::Parse {
                    path: self.path.clone(),
                    source,
                })?;
                FileContents::Json(value)
            }
            FileFormat::Raw => FileContents::Raw(bytes),
        };

        debug!(url = %self.archive.url(), path = %self.path, "file cached");
        *self.contents.write().expect("cache lock poisoned") = Some(contents.clone());
        Ok(contents)
    }

    /// Convenience for JSON files: `get` and unwrap the JSON value.
    ///
    /// Raw contents read as `Value::Null`.
    pub async fn get_json(&self, opts: &GetOptions) -> CacheResult<Value> {
        Ok(self.get(opts).await?.into_json().unwrap_or(Value::Null))
    }

    /// Replace the cached value and write it through to the archive.
    ///
    /// The cache is updated before the write, so a failed write leaves the
    /// new value cached.
    pub async fn put(&self, contents: FileContents) -> CacheResult<()> {
        let bytes = match &contents {
            FileContents::Json(value) => {
                serde_json::to_vec_pretty(value).map_err(|source| CacheError::Parse {
                    path: self.path.clone(),
                    source,
                })?
            }
            FileContents::Raw(bytes) => bytes.clone(),
        };
        *self.contents.write().expect("cache lock poisoned") = Some(contents);
        self.archive.write_file(&self.path, &bytes).await?;
        debug!(url = %self.archive.url(), path = %self.path, bytes = bytes.len(), "file written through");
        Ok(())
    }
}

impl std::fmt::Debug for CachedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFile")
            .field("url", &self.archive.url())
            .field("path", &self.path)
            .field("format", &self.format)
            .field("cached", &self.peek().is_some())
            .finish()
    }
}
