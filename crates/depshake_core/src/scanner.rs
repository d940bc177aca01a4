use log::{debug, trace};
use regex::{Captures, Regex};
use std::{collections::HashSet, sync::LazyLock};

use crate::{
    constants::MAX_SOURCE_CHARS,
    types::{ImportKind, Specifier},
};

/// A quoted string literal. Template literals only count when they hold no
/// interpolation.
pub(crate) const LITERAL: &str = r#"(?:'(?P<sq>[^'\n]*)'|"(?P<dq>[^"\n]*)"|`(?P<bq>[^`$]*)`)"#;

static STATIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(r"\bimport\b\s*(?:(?P<clause>[\w$*{{}},\s]+?)\s*\bfrom\s*)?{LITERAL}"))
});

static RE_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\bexport\b\s*(?P<clause>\*\s*(?:as\s+[\w$]+\s*)?|(?:type\s*)?\{{[^}}]*\}}\s*)from\s*{LITERAL}"
    ))
});

static DYNAMIC_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\bimport\s*\(\s*{LITERAL}\s*[,)]")));

static REQUIRE_CALL: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\brequire\s*\(\s*{LITERAL}\s*\)")));

pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static specifier pattern must compile")
}

/// The literal text matched by [`LITERAL`] inside `caps`.
pub(crate) fn literal_value<'h>(caps: &Captures<'h>) -> Option<&'h str> {
    caps.name("sq").or_else(|| caps.name("dq")).or_else(|| caps.name("bq")).map(|m| m.as_str())
}

/// Extracts module specifiers from raw source text.
///
/// Recognises static imports, re-exports, `import()` and `require()` with a
/// literal argument. Type-only imports and exports are skipped. The result is
/// deduplicated and ordered by first appearance. Sources longer than
/// [`MAX_SOURCE_CHARS`] characters yield nothing.
pub fn scan_specifiers(source: &str) -> Vec<Specifier> {
    if exceeds_size_guard(source) {
        debug!("Skipping scan of oversized source ({} bytes)", source.len());
        return Vec::new();
    }

    let mut found: Vec<(usize, Specifier)> = Vec::new();
    let patterns: [(&Regex, ImportKind); 4] = [
        (&STATIC_IMPORT, ImportKind::Static),
        (&RE_EXPORT, ImportKind::ReExport),
        (&DYNAMIC_IMPORT, ImportKind::Dynamic),
        (&REQUIRE_CALL, ImportKind::Require),
    ];
    for (re, kind) in patterns {
        for caps in re.captures_iter(source) {
            if caps.name("clause").is_some_and(|c| is_type_only(c.as_str())) {
                trace!("Skipping type-only {:?}", kind);
                continue;
            }
            let Some(request) = literal_value(&caps) else { continue };
            if request.is_empty() {
                continue;
            }
            let offset = caps.get(0).map_or(0, |m| m.start());
            found.push((offset, Specifier { request: request.to_string(), kind }));
        }
    }

    found.sort_by_key(|(offset, _)| *offset);
    let mut seen = HashSet::new();
    let specs: Vec<Specifier> = found
        .into_iter()
        .map(|(_, spec)| spec)
        .filter(|spec| seen.insert(spec.request.clone()))
        .collect();
    trace!("Scanned {} specifiers", specs.len());
    specs
}

pub(crate) fn exceeds_size_guard(source: &str) -> bool {
    // Byte length bounds the char count from above, so only count when needed.
    source.len() > MAX_SOURCE_CHARS && source.chars().count() > MAX_SOURCE_CHARS
}

/// `import type { A } from`, `import type A from`, `export type { A } from`.
/// `import type from 'x'` imports a binding called `type` and is kept.
fn is_type_only(clause: &str) -> bool {
    let Some(rest) = clause.trim_start().strip_prefix("type") else {
        return false;
    };
    match rest.chars().next() {
        Some('{') | Some('*') => true,
        Some(c) if c.is_whitespace() => {
            let rest = rest.trim_start();
            !rest.is_empty() && !rest.starts_with(',')
        }
        _ => false,
    }
}
