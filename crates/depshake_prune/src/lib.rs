//! Deployment manifest pruning on top of the depshake tracer.
//!
//! Traces an entry file, works out which installed packages the reachable
//! files belong to, and writes a `package.json` that declares only those.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use depshake_prune::{PruneConfig, print_prune_report, run_prune};
//! use std::io::{BufWriter, Write};
//!
//! # async fn prune() -> anyhow::Result<()> {
//! let cfg = PruneConfig::parse_from(["prune", "src/server.js", "--output", "dist/package.json"]);
//! let report = run_prune(cfg).await?;
//!
//! let mut stdout = BufWriter::new(std::io::stdout());
//! print_prune_report(&mut stdout, &report)?;
//! stdout.flush()?;
//! # Ok(())
//! # }
//! ```

mod assemble;
mod classify;
mod config;
mod project;
mod reporter;
mod runner;

#[cfg(test)]
mod test_utils;

// Re-export public API
pub use assemble::{
    AssembleOptions, Assembled, Declaration, PackageUse, UnusedDependency, assemble,
    merge_existing,
};
pub use classify::{PathOrigin, UsedPackage, classify_path, collect_packages};
pub use config::{EntryArgs, PruneConfig, TraceConfig};
pub use project::{DependencySection, ProjectManifest, find_project_root};
pub use reporter::{print_prune_report, print_trace_json, print_trace_report};
pub use runner::{PruneReport, TraceReport, run_prune, run_trace};
