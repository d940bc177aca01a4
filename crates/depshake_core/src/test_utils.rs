//! Fixtures and instrumented filesystems for unit tests.

use async_trait::async_trait;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use crate::fs::{FileMetadata, FileSystem, OsFileSystem};

pub(crate) fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
    let file_path = dir.join(path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&file_path, content).expect("Failed to write test file");
    file_path
}

/// Canonical form of a temp dir (macOS puts `/var` behind a symlink).
pub(crate) fn canonical_root(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

/// Real filesystem that counts every underlying call.
#[derive(Debug, Default)]
pub(crate) struct CountingFs {
    reads: AtomicUsize,
    stats: AtomicUsize,
    links: AtomicUsize,
    dirs: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingFs {
    /// Every read sleeps for `delay` first, so concurrent callers overlap.
    pub(crate) fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Most reads that were in progress at the same moment.
    pub(crate) fn max_concurrent_reads(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn stats(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }

    pub(crate) fn links(&self) -> usize {
        self.links.load(Ordering::SeqCst)
    }

    pub(crate) fn dirs(&self) -> usize {
        self.dirs.load(Ordering::SeqCst)
    }

    pub(crate) fn total(&self) -> usize {
        self.reads() + self.stats() + self.links() + self.dirs()
    }
}

#[async_trait]
impl FileSystem for CountingFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = OsFileSystem.read(path).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        OsFileSystem.metadata(path).await
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.links.fetch_add(1, Ordering::SeqCst);
        OsFileSystem.read_link(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.dirs.fetch_add(1, Ordering::SeqCst);
        OsFileSystem.read_dir(path).await
    }
}

/// Fails the first `failures` reads with EMFILE, then reads from disk.
#[derive(Debug)]
pub(crate) struct FlakyFs {
    failures: AtomicUsize,
    attempts: AtomicUsize,
}

impl FlakyFs {
    pub(crate) fn new(failures: usize) -> Self {
        Self { failures: AtomicUsize::new(failures), attempts: AtomicUsize::new(0) }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileSystem for FlakyFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(io::Error::from_raw_os_error(24));
        }
        OsFileSystem.read(path).await
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        OsFileSystem.metadata(path).await
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        OsFileSystem.read_link(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        OsFileSystem.read_dir(path).await
    }
}
