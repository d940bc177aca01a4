use log::{debug, trace, warn};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    cache::MemoCache,
    error::{Result, TraceError, is_resource_exhaustion},
    fs::{FileMetadata, FileSystem, OsFileSystem},
    gate::Gate,
};

/// Pause before retrying a read that hit the open-file limit.
const EXHAUSTION_RETRY_DELAY: Duration = Duration::from_millis(100);

/// How file bytes are handed back by [`CachedFs::read_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Raw bytes
    Bytes,
    /// Lossily decoded UTF-8 text
    Utf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Bytes(Arc<[u8]>),
    Text(Arc<str>),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Bytes(b) => b,
            FileContent::Text(t) => t.as_bytes(),
        }
    }
}

/// Entry counts of the accessor caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub reads: usize,
    pub stats: usize,
    pub links: usize,
    pub dirs: usize,
}

/// Memoizing filesystem accessor.
///
/// Every operation waits for a [`Gate`] slot before touching the underlying
/// [`FileSystem`], and every result (including failures) is cached per key so
/// concurrent callers for the same key share one underlying call.
#[derive(Debug)]
pub struct CachedFs {
    inner: Arc<dyn FileSystem>,
    gate: Gate,
    reads: MemoCache<(PathBuf, Encoding), Result<FileContent>>,
    stats: MemoCache<PathBuf, Result<FileMetadata>>,
    links: MemoCache<PathBuf, Result<Option<PathBuf>>>,
    dirs: MemoCache<PathBuf, Result<Arc<[PathBuf]>>>,
}

impl CachedFs {
    pub fn new(concurrency: usize) -> Self {
        Self::with_fs(Arc::new(OsFileSystem), concurrency)
    }

    pub fn with_fs(inner: Arc<dyn FileSystem>, concurrency: usize) -> Self {
        Self {
            inner,
            gate: Gate::new(concurrency),
            reads: MemoCache::new(),
            stats: MemoCache::new(),
            links: MemoCache::new(),
            dirs: MemoCache::new(),
        }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub async fn read_file(&self, path: &Path, encoding: Encoding) -> Result<FileContent> {
        let key = (path.to_path_buf(), encoding);
        self.reads.get_or_init(key, || self.load(path, encoding)).await
    }

    pub async fn read_text(&self, path: &Path) -> Result<Arc<str>> {
        match self.read_file(path, Encoding::Utf8).await? {
            FileContent::Text(text) => Ok(text),
            FileContent::Bytes(bytes) => Ok(Arc::from(String::from_utf8_lossy(&bytes))),
        }
    }

    pub async fn stat(&self, path: &Path) -> Result<FileMetadata> {
        self.stats
            .get_or_init(path.to_path_buf(), || async {
                let _permit = self.gate.acquire().await?;
                trace!("stat {}", path.display());
                self.inner.metadata(path).await.map_err(|e| TraceError::io("stat", path, e))
            })
            .await
    }

    /// Target of the symlink at `path`; `None` when `path` is not a symlink
    /// or does not exist.
    pub async fn read_link(&self, path: &Path) -> Result<Option<PathBuf>> {
        self.links
            .get_or_init(path.to_path_buf(), || async {
                let _permit = self.gate.acquire().await?;
                trace!("readlink {}", path.display());
                match self.inner.read_link(path).await {
                    Ok(target) => Ok(Some(target)),
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::NotFound
                                | io::ErrorKind::InvalidInput
                                | io::ErrorKind::NotADirectory
                        ) =>
                    {
                        Ok(None)
                    }
                    Err(e) => Err(TraceError::io("readlink", path, e)),
                }
            })
            .await
    }

    /// Entries of the directory at `path`, sorted.
    pub async fn read_dir(&self, path: &Path) -> Result<Arc<[PathBuf]>> {
        self.dirs
            .get_or_init(path.to_path_buf(), || async {
                let _permit = self.gate.acquire().await?;
                trace!("readdir {}", path.display());
                let mut entries = self
                    .inner
                    .read_dir(path)
                    .await
                    .map_err(|e| TraceError::io("readdir", path, e))?;
                entries.sort();
                Ok(Arc::from(entries))
            })
            .await
    }

    /// True when `path` exists and is a regular file.
    pub async fn is_file(&self, path: &Path) -> bool {
        matches!(self.stat(path).await, Ok(meta) if meta.is_file)
    }

    pub async fn is_dir(&self, path: &Path) -> bool {
        matches!(self.stat(path).await, Ok(meta) if meta.is_dir)
    }

    pub async fn exists(&self, path: &Path) -> bool {
        self.stat(path).await.is_ok()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            reads: self.reads.len(),
            stats: self.stats.len(),
            links: self.links.len(),
            dirs: self.dirs.len(),
        }
    }

    async fn load(&self, path: &Path, encoding: Encoding) -> Result<FileContent> {
        let bytes = match self.read_once(path).await {
            Err(TraceError::Io { source, .. }) if is_resource_exhaustion(&source) => {
                warn!("Too many open files reading {}, retrying once", path.display());
                tokio::time::sleep(EXHAUSTION_RETRY_DELAY).await;
                self.read_once(path).await?
            }
            other => other?,
        };
        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(match encoding {
            Encoding::Bytes => FileContent::Bytes(Arc::from(bytes)),
            Encoding::Utf8 => FileContent::Text(Arc::from(String::from_utf8_lossy(&bytes))),
        })
    }

    async fn read_once(&self, path: &Path) -> Result<Vec<u8>> {
        let _permit = self.gate.acquire().await?;
        trace!("read {}", path.display());
        self.inner.read(path).await.map_err(|e| TraceError::io("read", path, e))
    }
}
