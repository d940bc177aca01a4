use depshake_core::{MANIFEST_FILE, NODE_MODULES, Resolver};
use indexmap::IndexMap;
use log::{debug, trace};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// Where a traced file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOrigin {
    /// Project code outside any `node_modules`
    Local,
    /// A file inside an installed package
    Package { name: String, root: PathBuf },
}

/// Classifies `path` by its last `node_modules` segment, so files of pnpm's
/// `.pnpm/<pkg>@<version>/node_modules/<pkg>` layout belong to `<pkg>`.
pub fn classify_path(path: &Path) -> PathOrigin {
    let components: Vec<Component> = path.components().collect();
    for idx in (0..components.len()).rev() {
        if components[idx].as_os_str() != NODE_MODULES {
            continue;
        }
        if let Some((name, len)) = package_name(&components[idx + 1..]) {
            let root: PathBuf = components[..idx + 1 + len].iter().collect();
            return PathOrigin::Package { name, root };
        }
    }
    PathOrigin::Local
}

/// Package name at the start of `rest` and the number of components it spans.
fn package_name(rest: &[Component]) -> Option<(String, usize)> {
    let first = rest.first()?.as_os_str().to_str()?;
    if first.starts_with('.') {
        return None;
    }
    if first.starts_with('@') {
        let second = rest.get(1)?.as_os_str().to_str()?;
        // A scope directory on its own is not a package.
        if rest.len() < 3 {
            return None;
        }
        return Some((format!("{}/{}", first, second), 2));
    }
    // A bare package directory with no file below it is not a traced file.
    if rest.len() < 2 {
        return None;
    }
    Some((first.to_string(), 1))
}

/// An installed package reached by the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsedPackage {
    pub name: String,
    /// Version from the installed package's manifest
    pub version: Option<String>,
    pub root: PathBuf,
    /// Number of traced files inside the package
    pub files: usize,
}

/// Traced files grouped into packages, sorted by name, plus the number of
/// local files. When one name is installed at several roots, the first root
/// the trace reached wins.
pub async fn collect_packages<'a>(
    paths: impl IntoIterator<Item = &'a PathBuf>,
    resolver: &Resolver,
) -> (Vec<UsedPackage>, usize) {
    let mut packages: IndexMap<String, UsedPackage> = IndexMap::new();
    let mut local = 0;
    for path in paths {
        match classify_path(path) {
            PathOrigin::Local => local += 1,
            PathOrigin::Package { name, root } => {
                trace!("{} belongs to '{}'", path.display(), name);
                packages
                    .entry(name.clone())
                    .or_insert_with(|| UsedPackage { name, version: None, root, files: 0 })
                    .files += 1;
            }
        }
    }

    for package in packages.values_mut() {
        let manifest = resolver.load_manifest(&package.root.join(MANIFEST_FILE)).await;
        package.version = manifest.and_then(|m| m.version().map(str::to_string));
        debug!(
            "Package '{}' ({}) contributes {} files",
            package.name,
            package.version.as_deref().unwrap_or("unknown version"),
            package.files
        );
    }

    packages.sort_keys();
    (packages.into_values().collect(), local)
}
