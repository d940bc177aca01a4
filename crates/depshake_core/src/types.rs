use indexmap::IndexSet;
use serde::Serialize;
use std::path::PathBuf;

/// A module reference found in source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Specifier {
    pub request: String,
    pub kind: ImportKind,
}

/// Syntactic shape a specifier was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportKind {
    Static,
    ReExport,
    Dynamic,
    Require,
}

/// Output of the asset-aware traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetTrace {
    /// Source and data files reached through imports, in visiting order
    pub files: IndexSet<PathBuf>,
    /// Files referenced by path literals, never traversed
    pub assets: IndexSet<PathBuf>,
}
