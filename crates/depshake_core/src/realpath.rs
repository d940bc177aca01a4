use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexSet;
use log::trace;
use path_clean::clean;
use std::path::{Path, PathBuf};

use crate::{
    accessor::CachedFs,
    error::{Result, SymlinkChain, TraceError},
};

impl CachedFs {
    /// Canonical location of `path`, following symlinks for anything under
    /// `base`.
    ///
    /// Paths outside `base` come back unchanged, and so do paths under
    /// `base` that only reach their target through a link pointing outside
    /// it. Revisiting a path during one call is a symlink cycle and fails
    /// with [`TraceError::SymlinkCycle`].
    pub async fn realpath(&self, path: &Path, base: &Path) -> Result<PathBuf> {
        let mut seen = IndexSet::new();
        let real = self.realpath_inner(path.to_path_buf(), base, &mut seen).await?;
        Ok(real.unwrap_or_else(|| path.to_path_buf()))
    }

    /// `None` when resolution leaves `base`.
    fn realpath_inner<'a>(
        &'a self,
        path: PathBuf,
        base: &'a Path,
        seen: &'a mut IndexSet<PathBuf>,
    ) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        async move {
            if !path.starts_with(base) {
                return Ok(None);
            }
            if seen.contains(&path) {
                let mut chain: Vec<PathBuf> = seen.iter().cloned().collect();
                chain.push(path.clone());
                return Err(TraceError::SymlinkCycle { path, chain: SymlinkChain(chain) });
            }
            seen.insert(path.clone());

            if let Some(target) = self.read_link(&path).await? {
                let parent = path.parent().unwrap_or(base);
                let resolved = clean(parent.join(&target));
                if !resolved.starts_with(base) {
                    trace!("{} points outside the base at {}", path.display(), resolved.display());
                    return Ok(None);
                }
                trace!("{} -> {}", path.display(), resolved.display());
                return self.realpath_inner(resolved, base, seen).await;
            }

            if path == base {
                return Ok(Some(path));
            }
            match (path.parent(), path.file_name()) {
                (Some(parent), Some(name)) => {
                    let name = name.to_os_string();
                    let real_parent = self.realpath_inner(parent.to_path_buf(), base, seen).await?;
                    Ok(real_parent.map(|real| real.join(name)))
                }
                _ => Ok(Some(path)),
            }
        }
        .boxed()
    }
}
