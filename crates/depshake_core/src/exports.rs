//! Conditional `exports` map evaluation.
//!
//! Supports string and condition-object sugar for the root subpath, exact
//! subpath keys, single-`*` patterns (longest prefix wins) and legacy
//! trailing-slash folder mappings. The only named conditions are `import`,
//! `require` and `default`; anything else is reachable only through the
//! first-string fallback.

use serde_json::{Map, Value};

/// Which of `import` / `require` wins when a target offers both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConditionPreference {
    #[default]
    Import,
    Require,
}

impl ConditionPreference {
    pub fn order(self) -> [&'static str; 3] {
        match self {
            ConditionPreference::Import => ["import", "default", "require"],
            ConditionPreference::Require => ["require", "default", "import"],
        }
    }
}

/// The raw target (e.g. `./dist/index.js`) that `exports` maps `subpath` to.
pub fn exports_target(exports: &Value, subpath: &str, pref: ConditionPreference) -> Option<String> {
    match exports {
        Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => {
            subpath_target(map, subpath, pref)
        }
        // Anything else is shorthand for `{ ".": exports }`.
        _ if subpath == "." => resolve_target(exports, pref),
        _ => None,
    }
}

fn subpath_target(
    map: &Map<String, Value>,
    subpath: &str,
    pref: ConditionPreference,
) -> Option<String> {
    if let Some(value) = map.get(subpath) {
        return resolve_target(value, pref);
    }

    let mut best: Option<(usize, &Value, &str)> = None;
    for (key, value) in map {
        let Some((prefix, suffix)) = key.split_once('*') else { continue };
        if subpath.len() < prefix.len() + suffix.len()
            || !subpath.starts_with(prefix)
            || !subpath.ends_with(suffix)
        {
            continue;
        }
        if best.is_none_or(|(len, _, _)| prefix.len() > len) {
            let matched = &subpath[prefix.len()..subpath.len() - suffix.len()];
            best = Some((prefix.len(), value, matched));
        }
    }
    if let Some((_, value, matched)) = best {
        return resolve_target(value, pref).map(|target| target.replace('*', matched));
    }

    let folder = map
        .iter()
        .filter(|(key, _)| key.ends_with('/') && subpath.starts_with(key.as_str()))
        .max_by_key(|(key, _)| key.len());
    folder.and_then(|(key, value)| {
        resolve_target(value, pref).map(|target| format!("{}{}", target, &subpath[key.len()..]))
    })
}

fn resolve_target(value: &Value, pref: ConditionPreference) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|item| resolve_target(item, pref)),
        Value::Object(conditions) => pref
            .order()
            .iter()
            .find_map(|cond| conditions.get(*cond).and_then(|v| resolve_target(v, pref)))
            .or_else(|| {
                // Type declarations never point at runtime code.
                conditions
                    .iter()
                    .filter(|(cond, _)| cond.as_str() != "types")
                    .find_map(|(_, v)| v.as_str().map(str::to_string))
            }),
        _ => None,
    }
}
