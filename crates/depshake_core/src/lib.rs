//! Core engine for depshake.
//!
//! This crate computes the set of JavaScript/TypeScript files reachable from
//! an entry file, including:
//! - Scanning import, re-export, `import()` and `require()` specifiers
//! - Resolving specifiers Node.js style (relative paths, `node_modules`,
//!   `exports` maps)
//! - Canonicalizing paths through symlinks with cycle detection
//! - Cached, concurrency-limited filesystem access
//! - Optional collection of runtime-loaded asset files

mod accessor;
mod asset_trace;
mod builtins;
mod cache;
mod config;
mod constants;
mod error;
mod exports;
mod fs;
mod gate;
mod manifest;
mod realpath;
mod resolver;
mod scanner;
mod specifier;
mod trace;
mod types;
mod worklist;

#[cfg(test)]
mod test_utils;

// Re-export public API
pub use accessor::{CacheStats, CachedFs, Encoding, FileContent};
pub use asset_trace::trace_with_assets;
pub use builtins::is_builtin;
pub use config::TraceOptions;
pub use constants::{
    ASSET_EXTENSIONS, DEFAULT_CONCURRENCY, MANIFEST_FILE, NODE_MODULES, SOURCE_EXTENSIONS,
    is_source_path,
};
pub use error::{Result, SymlinkChain, TraceError};
pub use exports::{ConditionPreference, exports_target};
pub use fs::{FileMetadata, FileSystem, OsFileSystem};
pub use gate::{Gate, GatePermit};
pub use manifest::PackageManifest;
pub use resolver::{Resolver, ResolverOptions, ResolverStats};
pub use scanner::scan_specifiers;
pub use specifier::{BareSpecifier, SpecifierKind, classify_specifier, parse_bare};
pub use trace::{Tracer, trace};
pub use types::{AssetTrace, ImportKind, Specifier};
