use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser};
use depshake_core::{ConditionPreference, DEFAULT_CONCURRENCY, TraceOptions};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::project::find_project_root;

/// Flags shared by every subcommand that traces from an entry file.
#[derive(Debug, Clone, Args)]
pub struct EntryArgs {
    /// Entry file to trace from
    pub entry: PathBuf,

    /// Directory under which symlinks are followed (defaults to the project root)
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Package or specifier to leave untraced; also excludes its subpaths
    #[arg(long = "external", value_name = "SPECIFIER")]
    pub externals: Vec<String>,

    /// Maximum number of simultaneous filesystem operations
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Prefer `require` over `import` when resolving conditional exports
    #[arg(long)]
    pub prefer_require: bool,

    #[clap(skip)]
    pub root: Option<PathBuf>,
}

impl EntryArgs {
    /// Canonicalize the entry and base, and locate the project root
    pub fn initialize(&mut self) -> Result<()> {
        let entry = self
            .entry
            .canonicalize()
            .with_context(|| format!("Entry file not found: {}", self.entry.display()))?;
        if !entry.is_file() {
            return Err(anyhow!("Entry is not a file: {}", entry.display()));
        }
        debug!("Canonical entry: {}", entry.display());

        let entry_dir = entry.parent().map(Path::to_path_buf).unwrap_or_else(|| entry.clone());
        let root = match find_project_root(&entry_dir) {
            Ok(root) => root,
            Err(err) => {
                debug!("{}; using the entry directory", err);
                entry_dir
            }
        };
        info!("Using project root: {}", root.display());

        if let Some(base) = self.base.take() {
            debug!("Using provided base directory: {:?}", base);
            let base = base
                .canonicalize()
                .with_context(|| format!("Base directory not found: {}", base.display()))?;
            self.base = Some(base);
        }

        self.entry = entry;
        self.root = Some(root);
        Ok(())
    }

    /// Get the project root, returning an error if not initialized
    pub fn root(&self) -> Result<&PathBuf> {
        self.root
            .as_ref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }

    /// Validated traversal options built from the flags.
    pub fn trace_options(&self, collect_assets: bool) -> Result<TraceOptions> {
        let base = match &self.base {
            Some(base) => base.clone(),
            None => self.root()?.clone(),
        };
        let conditions = if self.prefer_require {
            ConditionPreference::Require
        } else {
            ConditionPreference::Import
        };
        let options = TraceOptions {
            base,
            externals: self.externals.clone(),
            concurrency: self.concurrency,
            collect_assets,
            conditions,
        };
        options.validate()?;
        Ok(options)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "trace")]
#[command(about = "List every file reachable from an entry file")]
pub struct TraceConfig {
    #[command(flatten)]
    pub entry: EntryArgs,

    /// Also report files loaded at runtime by path (templates, wasm, data files)
    #[arg(long)]
    pub assets: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl TraceConfig {
    pub fn initialize(&mut self) -> Result<()> {
        self.entry.initialize()
    }

    pub fn trace_options(&self) -> Result<TraceOptions> {
        self.entry.trace_options(self.assets)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "prune")]
#[command(about = "Write a package.json declaring only the packages an entry file uses")]
pub struct PruneConfig {
    #[command(flatten)]
    pub entry: EntryArgs,

    /// Project package.json (defaults to the one at the project root)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Where to write the pruned package.json; printed to stdout when omitted
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Emit only name, version, dependencies and the preserved fields
    #[arg(long)]
    pub minimal: bool,

    /// Extra top-level field to keep in minimal mode
    #[arg(long = "preserve", value_name = "FIELD")]
    pub preserve: Vec<String>,

    /// Pin used packages missing from the project manifest to their installed version
    #[arg(long)]
    pub include_undeclared: bool,
}

impl PruneConfig {
    /// Initialize the entry flags and default the manifest path to the project root
    pub fn initialize(&mut self) -> Result<()> {
        self.entry.initialize()?;
        if self.manifest.is_none() {
            let manifest = self.entry.root()?.join(depshake_core::MANIFEST_FILE);
            debug!("Using project manifest: {}", manifest.display());
            self.manifest = Some(manifest);
        }
        Ok(())
    }

    pub fn manifest(&self) -> Result<&PathBuf> {
        self.manifest
            .as_ref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }

    pub fn trace_options(&self) -> Result<TraceOptions> {
        self.entry.trace_options(false)
    }
}
