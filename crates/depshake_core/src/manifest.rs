use serde::Deserialize;
use serde_json::Value;

/// The fields of a package's `package.json` that resolution needs.
///
/// Fields are kept as raw JSON values so an odd `main` or `version` does not
/// make the whole manifest unreadable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub exports: Option<Value>,
    #[serde(default)]
    pub main: Option<Value>,
    #[serde(default)]
    pub module: Option<Value>,
}

impl PackageManifest {
    /// Parses manifest text; invalid JSON is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_ref().and_then(Value::as_str)
    }

    /// Entry fields in fallback order: `module`, then `main`.
    pub fn entry_fields(&self) -> impl Iterator<Item = &str> {
        [self.module.as_ref(), self.main.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields() {
        let m = PackageManifest::parse(
            r#"{"name":"pkg","version":"1.2.3","main":"lib/index.js","module":"esm/index.js","exports":{".":"./esm/index.js"}}"#,
        )
        .unwrap();
        assert_eq!(m.name.as_deref(), Some("pkg"));
        assert_eq!(m.version(), Some("1.2.3"));
        assert_eq!(m.entry_fields().collect::<Vec<_>>(), vec!["esm/index.js", "lib/index.js"]);
        assert!(m.exports.is_some());
    }

    #[test]
    fn test_invalid_json_is_none() {
        assert!(PackageManifest::parse("{ not json").is_none());
        assert!(PackageManifest::parse("").is_none());
    }

    #[test]
    fn test_odd_field_types_tolerated() {
        let m = PackageManifest::parse(r#"{"name":"pkg","main":["a.js"],"version":1}"#).unwrap();
        assert_eq!(m.entry_fields().count(), 0);
        assert_eq!(m.version(), None);
    }
}
