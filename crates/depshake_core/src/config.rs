use log::{debug, warn};
use std::path::PathBuf;
use tokio::sync::Semaphore;

use crate::{
    constants::DEFAULT_CONCURRENCY,
    error::{Result, TraceError},
    exports::ConditionPreference,
    resolver::ResolverOptions,
};

/// Everything a traversal needs to know, validated once by
/// [`TraceOptions::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    /// Symlinks are only followed for paths under this directory
    pub base: PathBuf,
    /// Specifiers left untraced: exact names, and `name/...` subpaths of them
    pub externals: Vec<String>,
    /// Maximum number of simultaneous filesystem operations
    pub concurrency: usize,
    /// Whether the asset-aware traversal records asset paths
    pub collect_assets: bool,
    /// Which `exports` condition wins between `import` and `require`
    pub conditions: ConditionPreference,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            base: PathBuf::from("/"),
            externals: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            collect_assets: false,
            conditions: ConditionPreference::Import,
        }
    }
}

impl TraceOptions {
    pub fn validate(&self) -> Result<()> {
        debug!(
            "Validating trace options: base={}, externals={}, concurrency={}",
            self.base.display(),
            self.externals.len(),
            self.concurrency
        );
        if !self.base.is_absolute() {
            return Err(TraceError::InvalidOptions(format!(
                "base directory must be absolute, got {}",
                self.base.display()
            )));
        }
        if self.externals.iter().any(|e| e.trim().is_empty()) {
            return Err(TraceError::InvalidOptions("external patterns must not be empty".into()));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(TraceError::InvalidOptions(format!(
                "concurrency {} exceeds the maximum of {}",
                self.concurrency,
                Semaphore::MAX_PERMITS
            )));
        }
        if self.concurrency == 0 {
            warn!("Concurrency 0 blocks every filesystem operation");
        }
        Ok(())
    }

    /// True when `specifier` is, or lives under, a declared external.
    pub fn is_external(&self, specifier: &str) -> bool {
        self.externals.iter().any(|pattern| {
            let pattern = pattern.trim_end_matches('/');
            specifier == pattern
                || specifier.strip_prefix(pattern).is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions { conditions: self.conditions }
    }
}
