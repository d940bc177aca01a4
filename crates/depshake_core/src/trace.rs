use futures::future::join_all;
use indexmap::IndexSet;
use log::{debug, info, trace, warn};
use path_clean::clean;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    accessor::CachedFs,
    config::TraceOptions,
    constants::is_source_path,
    error::{Result, TraceError},
    fs::{FileSystem, OsFileSystem},
    resolver::Resolver,
    scanner::scan_specifiers,
    specifier::{SpecifierKind, classify_specifier},
    worklist::Worklist,
};

/// Computes the set of files reachable from an entry file.
///
/// A tracer owns its caches, so repeated traces through one tracer reuse
/// every read, stat and resolution made by earlier ones.
#[derive(Debug)]
pub struct Tracer {
    options: TraceOptions,
    resolver: Arc<Resolver>,
}

impl Tracer {
    pub fn new(options: TraceOptions) -> Result<Self> {
        Self::with_fs(options, Arc::new(OsFileSystem))
    }

    pub fn with_fs(options: TraceOptions, fs: Arc<dyn FileSystem>) -> Result<Self> {
        options.validate()?;
        let cached = Arc::new(CachedFs::with_fs(fs, options.concurrency));
        let resolver = Arc::new(Resolver::new(cached, options.resolver_options()));
        Ok(Self { options, resolver })
    }

    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn fs(&self) -> &Arc<CachedFs> {
        self.resolver.fs()
    }

    /// Every file reachable from `entry`, entry first, in breadth-first
    /// discovery order. Paths are canonical for anything under the base
    /// directory.
    ///
    /// Each frontier level is read, scanned and resolved concurrently; the
    /// gate bounds how much of it touches the filesystem at once. Unreadable
    /// files are leaves. A symlink cycle aborts the trace.
    pub async fn trace(&self, entry: &Path) -> Result<IndexSet<PathBuf>> {
        let entry = absolute_entry(entry)?;
        info!("Tracing dependencies of {}", entry.display());

        let mut work = Worklist::new(&entry);
        loop {
            let level = work.take_level();
            if level.is_empty() {
                break;
            }
            let scan = self.visit_level(&mut work, &level).await?;
            let discovered = join_all(scan.iter().map(|path| self.dependencies_of(path))).await;
            for next in discovered.into_iter().flatten() {
                work.push(next);
            }
        }

        let files = work.into_visited();
        debug!(
            "Traced {} files from {} ({:?}, {:?})",
            files.len(),
            entry.display(),
            self.fs().stats(),
            self.resolver.stats()
        );
        Ok(files)
    }

    /// Canonicalizes one frontier level concurrently, then records it as
    /// visited in queue order. Returns the source files left to scan.
    pub(crate) async fn visit_level(
        &self,
        work: &mut Worklist,
        level: &[PathBuf],
    ) -> Result<Vec<PathBuf>> {
        trace!("Visiting a level of {} paths", level.len());
        let base = &self.options.base;
        let reals = join_all(level.iter().map(|path| self.fs().realpath(path, base))).await;

        let mut scan = Vec::with_capacity(level.len());
        for (path, real) in level.iter().zip(reals) {
            let real = match real {
                Ok(real) => real,
                Err(err @ TraceError::SymlinkCycle { .. }) => return Err(err),
                Err(err) => {
                    warn!("Skipping {}: {}", path.display(), err);
                    continue;
                }
            };
            if !work.mark_visited(real.clone()) {
                trace!("Already visited {}", real.display());
                continue;
            }
            if !is_source_path(&real) {
                trace!("Not scanning non-source file {}", real.display());
                continue;
            }
            scan.push(real);
        }
        Ok(scan)
    }

    async fn dependencies_of(&self, path: &Path) -> Vec<PathBuf> {
        let Some(source) = self.read_source(path).await else { return Vec::new() };
        let requests: Vec<String> = scan_specifiers(&source)
            .into_iter()
            .map(|spec| spec.request)
            .filter(|request| self.should_follow(request))
            .collect();
        self.resolve_all(path, &requests).await
    }

    pub(crate) async fn read_source(&self, path: &Path) -> Option<Arc<str>> {
        match self.fs().read_text(path).await {
            Ok(source) => Some(source),
            Err(err) => {
                debug!("Treating {} as a leaf: {}", path.display(), err);
                None
            }
        }
    }

    pub(crate) fn should_follow(&self, request: &str) -> bool {
        match classify_specifier(request) {
            SpecifierKind::Url | SpecifierKind::Builtin => false,
            _ if self.options.is_external(request) => {
                trace!("'{}' is external", request);
                false
            }
            _ => true,
        }
    }

    /// Resolves `requests` concurrently; unresolvable ones are dropped and
    /// the rest keep source order.
    pub(crate) async fn resolve_all(&self, from: &Path, requests: &[String]) -> Vec<PathBuf> {
        let lookups = requests.iter().map(|request| self.resolver.resolve_id(from, request));
        join_all(lookups).await.into_iter().flatten().collect()
    }
}

pub(crate) fn absolute_entry(entry: &Path) -> Result<PathBuf> {
    std::path::absolute(entry)
        .map(clean)
        .map_err(|err| TraceError::io("resolve entry", entry, err))
}

/// One-shot trace with fresh caches.
pub async fn trace(entry: &Path, options: &TraceOptions) -> Result<IndexSet<PathBuf>> {
    Tracer::new(options.clone())?.trace(entry).await
}
