use anyhow::{Context, Result, anyhow};
use depshake_core::MANIFEST_FILE;
use log::{debug, trace};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Walks up from `start` to the nearest directory holding a `package.json`.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    debug!("Searching for project root from {}", start.display());
    for dir in start.ancestors() {
        let manifest = dir.join(MANIFEST_FILE);
        trace!("Checking for manifest at: {:?}", manifest);
        if manifest.is_file() {
            debug!("Found project root at: {:?}", dir);
            return Ok(dir.to_path_buf());
        }
    }
    Err(anyhow!("Could not find {} in any parent of {}", MANIFEST_FILE, start.display()))
}

/// The four places a package can be declared, in lookup precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencySection {
    Dependencies,
    PeerDependencies,
    OptionalDependencies,
    DevDependencies,
}

impl DependencySection {
    pub const ALL: [DependencySection; 4] = [
        DependencySection::Dependencies,
        DependencySection::PeerDependencies,
        DependencySection::OptionalDependencies,
        DependencySection::DevDependencies,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DependencySection::Dependencies => "dependencies",
            DependencySection::PeerDependencies => "peerDependencies",
            DependencySection::OptionalDependencies => "optionalDependencies",
            DependencySection::DevDependencies => "devDependencies",
        }
    }

    pub fn is_section_key(key: &str) -> bool {
        Self::ALL.iter().any(|section| section.key() == key)
    }
}

/// A project `package.json` with every top-level field kept in file order.
#[derive(Debug, Clone)]
pub struct ProjectManifest {
    path: PathBuf,
    fields: Map<String, Value>,
}

impl ProjectManifest {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading project manifest {}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Self::from_value(path, value)
    }

    pub fn from_value(path: &Path, value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { path: path.to_path_buf(), fields }),
            _ => Err(anyhow!("{} is not a JSON object", path.display())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// `(name, range)` pairs of one section; non-string ranges are skipped.
    pub fn section(&self, section: DependencySection) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .get(section.key())
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .filter_map(|(name, range)| range.as_str().map(|range| (name.as_str(), range)))
    }

    /// First section declaring `package`, with its declared range.
    pub fn declaration(&self, package: &str) -> Option<(DependencySection, &str)> {
        DependencySection::ALL.into_iter().find_map(|section| {
            self.section(section)
                .find(|(name, _)| *name == package)
                .map(|(_, range)| (section, range))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_file;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_find_project_root_nearest() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", "{}");
        create_test_file(root, "packages/app/package.json", "{}");
        let nested = root.join("packages/app/src/deep");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested).unwrap(), root.join("packages/app"));
        assert_eq!(find_project_root(&root.join("packages")).unwrap(), root);
    }

    #[test]
    fn test_load_keeps_field_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_test_file(
            temp_dir.path(),
            "package.json",
            r#"{"version":"1.0.0","name":"app","scripts":{},"dependencies":{"a":"^1.0.0"}}"#,
        );

        let manifest = ProjectManifest::load(&path).unwrap();
        let keys: Vec<&str> = manifest.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["version", "name", "scripts", "dependencies"]);
        assert_eq!(manifest.name(), Some("app"));
        assert_eq!(manifest.version(), Some("1.0.0"));
    }

    #[test]
    fn test_load_errors() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ProjectManifest::load(&temp_dir.path().join("missing.json")).is_err());

        let broken = create_test_file(temp_dir.path(), "broken.json", "{ nope");
        assert!(ProjectManifest::load(&broken).is_err());

        let array = create_test_file(temp_dir.path(), "array.json", "[]");
        assert!(ProjectManifest::load(&array).is_err());
    }

    #[test]
    fn test_declaration_precedence() {
        let manifest = ProjectManifest::from_value(
            Path::new("package.json"),
            json!({
                "dependencies": { "a": "^1.0.0" },
                "peerDependencies": { "a": ">=1", "b": "^2.0.0" },
                "devDependencies": { "c": "3.0.0", "d": 4 }
            }),
        )
        .unwrap();

        assert_eq!(manifest.declaration("a"), Some((DependencySection::Dependencies, "^1.0.0")));
        assert_eq!(
            manifest.declaration("b"),
            Some((DependencySection::PeerDependencies, "^2.0.0"))
        );
        assert_eq!(manifest.declaration("c"), Some((DependencySection::DevDependencies, "3.0.0")));
        assert_eq!(manifest.declaration("d"), None);
        assert_eq!(manifest.declaration("e"), None);
    }
}
