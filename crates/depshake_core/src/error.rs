use std::{
    fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Result type for tracing operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// Errors surfaced by the tracing engine.
///
/// Ordinary resolution misses never show up here: missing files, unparsable
/// manifests and unknown specifiers all degrade to empty results. Cached
/// failures are shared between callers, hence `Clone` and the `Arc` around
/// the I/O error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TraceError {
    /// A symlink chain loops back on itself
    #[error("symlink cycle detected resolving {}: {chain}", .path.display())]
    SymlinkCycle { path: PathBuf, chain: SymlinkChain },

    /// Underlying filesystem failure
    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Options rejected at construction time
    #[error("invalid trace options: {0}")]
    InvalidOptions(String),

    /// The concurrency gate was closed while waiting for a slot
    #[error("concurrency gate closed")]
    GateClosed,
}

impl TraceError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        TraceError::Io { op, path: path.to_path_buf(), source: Arc::new(source) }
    }

    /// True for symlink cycles, the only structural failure traversals propagate.
    pub fn is_cycle(&self) -> bool {
        matches!(self, TraceError::SymlinkCycle { .. })
    }

    /// True when the error is `ENOENT`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TraceError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

// EMFILE / ENFILE on unix, ERROR_TOO_MANY_OPEN_FILES on windows.
#[cfg(unix)]
const EXHAUSTION_CODES: &[i32] = &[24, 23];
#[cfg(not(unix))]
const EXHAUSTION_CODES: &[i32] = &[4];

/// True when the OS refused to hand out another file handle.
pub(crate) fn is_resource_exhaustion(err: &io::Error) -> bool {
    err.raw_os_error().is_some_and(|code| EXHAUSTION_CODES.contains(&code))
}

/// The paths visited before a symlink cycle closed, in visiting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkChain(pub Vec<PathBuf>);

impl fmt::Display for SymlinkChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", p.display())?;
        }
        Ok(())
    }
}
