//! Constants for file extensions and resolution strategies.
//!
//! This module centralizes all file extension handling to ensure consistency
//! across scanning, resolution and traversal of JavaScript/TypeScript files.
//!
//! ## Supported Extensions
//!
//! - **TypeScript**: `.ts`, `.tsx`, `.mts` (ES module), `.cts` (CommonJS)
//! - **JavaScript**: `.js`, `.jsx`, `.mjs` (ES module), `.cjs` (CommonJS)
//!
//! Source-oriented extensions are probed before plain script extensions, so
//! `./util` resolves to `util.ts` when both `util.ts` and `util.js` exist.

/// File extensions whose contents are read and scanned for specifiers.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "ts",  // TypeScript
    "tsx", // TypeScript with JSX
    "mts", // TypeScript module
    "cts", // TypeScript CommonJS
    "js",  // JavaScript
    "jsx", // JavaScript with JSX
    "mjs", // JavaScript module
    "cjs", // JavaScript CommonJS
];

/// Extensions to try when resolving module imports (in priority order)
pub const RESOLVE_EXTENSIONS: &[&str] =
    &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "json"];

/// Index file names to try when resolving directory imports
pub const INDEX_FILES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.mts",
    "index.cts",
    "index.js",
    "index.jsx",
    "index.mjs",
    "index.cjs",
    "index.json",
];

/// Name of the per-package descriptor file.
pub const MANIFEST_FILE: &str = "package.json";

/// Directory holding installed packages.
pub const NODE_MODULES: &str = "node_modules";

/// Sources longer than this many characters are not scanned.
pub const MAX_SOURCE_CHARS: usize = 2_000_000;

/// Extensions treated as runtime-loaded assets by the asset-aware traversal.
pub const ASSET_EXTENSIONS: &[&str] = &[
    "json", "node", "wasm", "html", "htm", "css", "txt", "md", "xml", "yaml", "yml", "toml",
    "csv", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff", "woff2", "ttf", "otf",
    "eot", "mp3", "mp4", "wav", "pem", "crt", "key", "sql", "graphql", "proto", "hbs", "ejs",
    "pug",
];

/// Default number of simultaneous filesystem operations.
pub const DEFAULT_CONCURRENCY: usize = 1024;

/// Returns true when the path carries one of [`SOURCE_EXTENSIONS`].
pub fn is_source_path(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}
