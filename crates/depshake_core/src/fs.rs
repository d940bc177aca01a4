//! Filesystem abstraction underneath the cached accessor.
//!
//! The tracer never touches `tokio::fs` directly; it goes through a
//! [`FileSystem`] so tests can count or slow down the underlying calls.

use async_trait::async_trait;
use std::{
    io,
    path::{Path, PathBuf},
};

/// File metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// Whether this is a regular file
    pub is_file: bool,
    /// Whether this is a directory
    pub is_dir: bool,
    /// File size in bytes
    pub size: u64,
}

/// Raw, uncached filesystem operations.
#[async_trait]
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// Read the full contents of a file
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Metadata of the file a path points at, following symlinks
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;

    /// Target of a symlink, without following it
    async fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Full paths of the entries of a directory, in no particular order
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(FileMetadata { is_file: meta.is_file(), is_dir: meta.is_dir(), size: meta.len() })
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::read_link(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        Ok(paths)
    }
}
