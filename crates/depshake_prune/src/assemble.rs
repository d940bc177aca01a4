//! Builds the pruned `package.json` from the packages a trace reached.
//!
//! Every used package is matched against the project manifest. Declared
//! packages keep the range the project declared, whichever section it came
//! from, and are emitted under `dependencies`. Undeclared packages (usually
//! transitive dependencies hoisted into the project's `node_modules`) are
//! pinned to their installed version only when asked to.

use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    classify::UsedPackage,
    project::{DependencySection, ProjectManifest},
};

#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Emit only `name`, `version`, `dependencies` and the `preserve` fields
    pub minimal: bool,
    /// Top-level fields carried over in minimal mode
    pub preserve: Vec<String>,
    /// Pin undeclared packages to their installed version
    pub include_undeclared: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Declaration {
    Declared { section: DependencySection, range: String },
    Undeclared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageUse {
    pub name: String,
    pub version: Option<String>,
    pub files: usize,
    pub declaration: Declaration,
    /// Whether the package made it into the emitted `dependencies`
    pub emitted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedDependency {
    pub name: String,
    pub section: DependencySection,
}

#[derive(Debug, Clone)]
pub struct Assembled {
    pub manifest: Map<String, Value>,
    pub used: Vec<PackageUse>,
    /// Declared runtime packages the trace never reached
    pub unused: Vec<UnusedDependency>,
}

impl Assembled {
    pub fn emitted(&self) -> usize {
        self.used.iter().filter(|u| u.emitted).count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PackageUse> {
        self.used.iter().filter(|u| !u.emitted)
    }
}

pub fn assemble(
    project: &ProjectManifest,
    packages: &[UsedPackage],
    options: &AssembleOptions,
) -> Assembled {
    debug!(
        "Assembling manifest from {} packages (minimal: {}, include undeclared: {})",
        packages.len(),
        options.minimal,
        options.include_undeclared
    );

    let mut dependencies = Map::new();
    let mut used = Vec::with_capacity(packages.len());
    for package in packages {
        let declaration = match project.declaration(&package.name) {
            Some((section, range)) => Declaration::Declared { section, range: range.to_string() },
            None => Declaration::Undeclared,
        };
        let range = match &declaration {
            Declaration::Declared { range, .. } => Some(range.clone()),
            Declaration::Undeclared if options.include_undeclared => {
                Some(package.version.clone().unwrap_or_else(|| "*".to_string()))
            }
            Declaration::Undeclared => {
                warn!(
                    "'{}' is used but not declared in {}",
                    package.name,
                    project.path().display()
                );
                None
            }
        };
        let emitted = range.is_some();
        if let Some(range) = range {
            dependencies.insert(package.name.clone(), Value::String(range));
        }
        used.push(PackageUse {
            name: package.name.clone(),
            version: package.version.clone(),
            files: package.files,
            declaration,
            emitted,
        });
    }

    let unused: Vec<UnusedDependency> = [
        DependencySection::Dependencies,
        DependencySection::PeerDependencies,
        DependencySection::OptionalDependencies,
    ]
    .into_iter()
    .flat_map(move |section| {
        project
            .section(section)
            .filter(move |(name, _)| !packages.iter().any(|p| p.name == *name))
            .map(move |(name, _)| UnusedDependency { name: name.to_string(), section })
    })
    .collect();
    debug!("{} declared packages are unused", unused.len());

    let manifest = if options.minimal {
        minimal_manifest(project.fields(), dependencies, &options.preserve)
    } else {
        merged_manifest(project.fields(), dependencies)
    };
    Assembled { manifest, used, unused }
}

/// All original fields in order, with the dependency sections replaced by a
/// single `dependencies` object at the position of the original one.
fn merged_manifest(
    fields: &Map<String, Value>,
    dependencies: Map<String, Value>,
) -> Map<String, Value> {
    let mut out = Map::new();
    let mut dependencies = Some(dependencies);
    for (key, value) in fields {
        if key == DependencySection::Dependencies.key() {
            if let Some(deps) = dependencies.take() {
                out.insert(key.clone(), Value::Object(deps));
            }
        } else if !DependencySection::is_section_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }
    if let Some(deps) = dependencies {
        out.insert(DependencySection::Dependencies.key().to_string(), Value::Object(deps));
    }
    out
}

fn minimal_manifest(
    fields: &Map<String, Value>,
    dependencies: Map<String, Value>,
    preserve: &[String],
) -> Map<String, Value> {
    let mut out = Map::new();
    for key in ["name", "version"] {
        if let Some(value) = fields.get(key) {
            out.insert(key.to_string(), value.clone());
        }
    }
    out.insert(DependencySection::Dependencies.key().to_string(), Value::Object(dependencies));
    for key in preserve {
        if out.contains_key(key) {
            continue;
        }
        match fields.get(key) {
            Some(value) => {
                out.insert(key.clone(), value.clone());
            }
            None => debug!("Preserved field '{}' is not in the project manifest", key),
        }
    }
    out
}

/// Overlays `assembled` on an existing manifest: assembled fields replace
/// existing ones in place, new fields are appended, and dependency sections
/// the assembled manifest does not carry are removed.
pub fn merge_existing(
    existing: &Map<String, Value>,
    assembled: &Map<String, Value>,
) -> Map<String, Value> {
    let mut out: Map<String, Value> = existing
        .iter()
        .filter(|(key, _)| !DependencySection::is_section_key(key) || assembled.contains_key(*key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    for (key, value) in assembled {
        out.insert(key.clone(), value.clone());
    }
    out
}
