use log::{debug, trace};
use path_clean::clean;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    accessor::CachedFs,
    builtins::is_builtin,
    cache::MemoCache,
    constants::{INDEX_FILES, MANIFEST_FILE, NODE_MODULES, RESOLVE_EXTENSIONS},
    exports::{ConditionPreference, exports_target},
    manifest::PackageManifest,
    specifier::{SpecifierKind, classify_specifier, parse_bare},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    pub conditions: ConditionPreference,
}

/// Entry counts of the resolver caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub resolutions: usize,
    pub manifests: usize,
}

/// Maps `(importing file, specifier)` pairs to files on disk the way Node.js
/// does for relative paths and `node_modules` packages.
///
/// Results, including misses, are memoized per pair for the lifetime of the
/// resolver.
#[derive(Debug)]
pub struct Resolver {
    fs: Arc<CachedFs>,
    options: ResolverOptions,
    resolutions: MemoCache<(PathBuf, String), Option<PathBuf>>,
    manifests: MemoCache<PathBuf, Option<Arc<PackageManifest>>>,
}

impl Resolver {
    pub fn new(fs: Arc<CachedFs>, options: ResolverOptions) -> Self {
        Self { fs, options, resolutions: MemoCache::new(), manifests: MemoCache::new() }
    }

    pub fn fs(&self) -> &Arc<CachedFs> {
        &self.fs
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats { resolutions: self.resolutions.len(), manifests: self.manifests.len() }
    }

    /// Resolves `specifier` as imported from `from`. `None` means built-in,
    /// missing or unparsable.
    pub async fn resolve_id(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        if is_builtin(specifier) {
            trace!("'{}' is a built-in", specifier);
            return None;
        }
        let key = (from.to_path_buf(), specifier.to_string());
        if let Some(hit) = self.resolutions.get(&key) {
            trace!("Cache hit for resolve: '{}' from {}", specifier, from.display());
            return hit;
        }
        self.resolutions.get_or_init(key, || self.resolve_uncached(from, specifier)).await
    }

    async fn resolve_uncached(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        trace!("Resolving: '{}' from {}", specifier, from.display());
        let resolved = match classify_specifier(specifier) {
            SpecifierKind::Builtin | SpecifierKind::Url => None,
            SpecifierKind::Relative => {
                let base = from.parent().unwrap_or(from);
                self.probe(&clean(base.join(specifier))).await
            }
            SpecifierKind::Bare => self.resolve_bare(from, specifier).await,
        };
        match &resolved {
            Some(path) => debug!("Resolved '{}' to {}", specifier, path.display()),
            None => trace!("Failed to resolve '{}' from {}", specifier, from.display()),
        }
        resolved
    }

    /// Probes `path`, then `path.<ext>`, then `path/index.<ext>`.
    pub async fn probe(&self, path: &Path) -> Option<PathBuf> {
        if self.fs.is_file(path).await {
            return Some(path.to_path_buf());
        }
        for ext in RESOLVE_EXTENSIONS {
            let candidate = with_extension_appended(path, ext);
            if self.fs.is_file(&candidate).await {
                return Some(candidate);
            }
        }
        self.probe_index(path).await
    }

    async fn probe_index(&self, dir: &Path) -> Option<PathBuf> {
        for index_file in INDEX_FILES {
            let candidate = dir.join(index_file);
            if self.fs.is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    async fn resolve_bare(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        let bare = parse_bare(specifier)?;
        let (root, manifest) = self.find_package_root(from, bare.package).await?;
        trace!("Package '{}' rooted at {}", bare.package, root.display());

        let target = manifest
            .as_deref()
            .and_then(|m| m.exports.as_ref())
            .and_then(|exports| exports_target(exports, &bare.subpath, self.options.conditions));
        if let Some(target) = target {
            trace!("exports maps '{}' to '{}'", bare.subpath, target);
            return self.probe(&join_target(&root, &target)).await;
        }

        if !bare.is_root() {
            return self.probe(&join_target(&root, &bare.subpath)).await;
        }
        if let Some(manifest) = &manifest {
            for field in manifest.entry_fields() {
                if let Some(found) = self.probe(&join_target(&root, field)).await {
                    return Some(found);
                }
            }
        }
        self.probe_index(&root).await
    }

    /// Nearest `node_modules/<package>` above `from` whose manifest declares
    /// `package` (or no name at all), or which exists without a manifest.
    async fn find_package_root(
        &self,
        from: &Path,
        package: &str,
    ) -> Option<(PathBuf, Option<Arc<PackageManifest>>)> {
        let start = from.parent()?;
        for dir in start.ancestors() {
            if dir.file_name().is_some_and(|name| name == NODE_MODULES) {
                continue;
            }
            let pkg_dir = dir.join(NODE_MODULES).join(package);
            match self.load_manifest(&pkg_dir.join(MANIFEST_FILE)).await {
                Some(manifest) if manifest.name.as_deref().is_none_or(|n| n == package) => {
                    return Some((pkg_dir, Some(manifest)));
                }
                Some(manifest) => {
                    trace!(
                        "Skipping {}: manifest names '{}'",
                        pkg_dir.display(),
                        manifest.name.as_deref().unwrap_or_default()
                    );
                }
                None if self.fs.is_dir(&pkg_dir).await => return Some((pkg_dir, None)),
                None => {}
            }
        }
        None
    }

    /// Parsed manifest at `path`; unreadable or invalid manifests are `None`.
    pub async fn load_manifest(&self, path: &Path) -> Option<Arc<PackageManifest>> {
        self.manifests
            .get_or_init(path.to_path_buf(), || async {
                let text = self.fs.read_text(path).await.ok()?;
                let manifest = PackageManifest::parse(&text);
                if manifest.is_none() {
                    debug!("Ignoring unparsable manifest {}", path.display());
                }
                manifest.map(Arc::new)
            })
            .await
    }
}

fn with_extension_appended(path: &Path, ext: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_os_string();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

fn join_target(root: &Path, target: &str) -> PathBuf {
    clean(root.join(target.trim_start_matches("./")))
}
