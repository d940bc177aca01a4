//! Traversal variant that also records files a module loads at runtime by
//! path rather than by import.
//!
//! Dependency discovery here uses its own lighter pattern set, so type-only
//! imports are followed too. Asset candidates are recognised from common
//! `__dirname` and `import.meta.url` idioms, from quoted relative paths with a
//! known asset extension, and from paths built around one dynamic part
//! (`` `./locales/${lang}.json` ``, `'./img/' + name + '.png'`). Those last
//! ones are matched against the directory their static prefix names. Only
//! candidates that are existing regular files are kept.

use futures::future::{join, join_all};
use indexmap::IndexSet;
use log::{debug, info, trace};
use path_clean::clean;
use regex::{Captures, Regex};
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use crate::{
    config::TraceOptions,
    constants::ASSET_EXTENSIONS,
    error::Result,
    scanner::{LITERAL, compile, exceeds_size_guard, literal_value},
    trace::{Tracer, absolute_entry},
    types::AssetTrace,
    worklist::Worklist,
};

static DEPENDENCY: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?:\bfrom\s*|\bimport\s*\(\s*|\bimport\s*|\brequire(?:\.resolve)?\s*\(\s*){LITERAL}"
    ))
});

static DIRNAME_TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"`\$\{\s*__dirname\s*\}(?P<rest>[^`$]*)`"));

/// Template literal with one interpolation and a static relative prefix.
static INTERPOLATED_TEMPLATE: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"`(?:\$\{\s*__dirname\s*\}(?P<dir_prefix>/[^`$]*)|(?P<rel_prefix>\.{1,2}/[^`$]*))",
        r"\$\{[^`}]*\}(?P<suffix>[^`$]*)`",
    ))
});

static DIRNAME_CONCAT: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\b__dirname\s*\+\s*{LITERAL}(?P<more>\s*\+)?")));

/// `'prefix' + expr`, optionally followed by `+ 'suffix'` and preceded by
/// `__dirname +`.
static CONCAT_BUILT: LazyLock<Regex> = LazyLock::new(|| {
    compile(concat!(
        r"(?P<dirname>\b__dirname\s*\+\s*)?",
        r#"(?:'(?P<head_sq>[^'\n]*)'|"(?P<head_dq>[^"\n]*)")\s*\+\s*[\w$.]+"#,
        r#"(?:\s*\+\s*(?:'(?P<tail_sq>[^'\n]*)'|"(?P<tail_dq>[^"\n]*)"))?"#,
    ))
});

static DIRNAME_JOIN: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b(?:join|resolve)\s*\(\s*__dirname\s*(?P<segments>(?:,\s*{LITERAL}\s*)+)\)"
    ))
});

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| compile(LITERAL));

static META_URL: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(r"\bnew\s+URL\s*\(\s*{LITERAL}\s*,\s*import\.meta\.url\s*\)"))
});

static QUOTED_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    let exts = ASSET_EXTENSIONS.join("|");
    compile(&format!(
        r#"(?:'(?P<sq>\.{{1,2}}/[\w@.~/-]*\.(?:{exts}))'|"(?P<dq>\.{{1,2}}/[\w@.~/-]*\.(?:{exts}))")"#
    ))
});

/// Somewhere a module may load a file from at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum AssetCandidate {
    Path(PathBuf),
    /// Entries of `dir` named `prefix` + anything + `suffix`. A `/` in the
    /// suffix continues below the matched entry.
    Pattern { dir: PathBuf, prefix: String, suffix: String },
}

impl Tracer {
    /// Like [`Tracer::trace`], additionally collecting referenced assets
    /// when [`TraceOptions::collect_assets`] is set.
    ///
    /// Assets are reported, never traversed.
    pub async fn trace_with_assets(&self, entry: &Path) -> Result<AssetTrace> {
        let entry = absolute_entry(entry)?;
        info!("Tracing dependencies and assets of {}", entry.display());

        let mut work = Worklist::new(&entry);
        let mut assets = IndexSet::new();
        loop {
            let level = work.take_level();
            if level.is_empty() {
                break;
            }
            let scan = self.visit_level(&mut work, &level).await?;
            let scanned = join_all(scan.iter().map(|path| self.scan_with_assets(path))).await;
            for (dependencies, found) in scanned {
                for next in dependencies {
                    work.push(next);
                }
                assets.extend(found);
            }
        }

        let files = work.into_visited();
        debug!("Traced {} files and {} assets from {}", files.len(), assets.len(), entry.display());
        Ok(AssetTrace { files, assets })
    }

    /// Resolved dependencies and existing assets of one source file.
    async fn scan_with_assets(&self, path: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let Some(source) = self.read_source(path).await else { return Default::default() };
        if exceeds_size_guard(&source) {
            debug!("Skipping scan of oversized source {}", path.display());
            return Default::default();
        }

        let requests = dependency_requests(&source);
        let followed: Vec<String> =
            requests.iter().filter(|r| self.should_follow(r)).cloned().collect();
        let dependencies = self.resolve_all(path, &followed);
        if !self.options().collect_assets {
            return (dependencies.await, Vec::new());
        }

        let dir = path.parent().unwrap_or(path);
        let candidates = asset_candidates(&source, dir, &requests);
        let (dependencies, assets) = join(dependencies, self.asset_files(candidates)).await;
        for asset in &assets {
            trace!("Asset {} referenced by {}", asset.display(), path.display());
        }
        (dependencies, assets)
    }

    /// Regular files the candidates name, in candidate order.
    async fn asset_files(&self, candidates: Vec<AssetCandidate>) -> Vec<PathBuf> {
        let expanded = join_all(candidates.into_iter().map(|c| self.expand(c))).await;
        let paths: Vec<PathBuf> = expanded.into_iter().flatten().collect();
        let checks = join_all(paths.iter().map(|path| self.fs().is_file(path))).await;
        paths.into_iter().zip(checks).filter_map(|(path, file)| file.then_some(path)).collect()
    }

    async fn expand(&self, candidate: AssetCandidate) -> Vec<PathBuf> {
        let (dir, prefix, suffix) = match candidate {
            AssetCandidate::Path(path) => return vec![path],
            AssetCandidate::Pattern { dir, prefix, suffix } => (dir, prefix, suffix),
        };
        let entries = match self.fs().read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) => {
                trace!("No assets under {}: {}", dir.display(), err);
                return Vec::new();
            }
        };
        let (name_suffix, below) = suffix.split_once('/').unwrap_or((suffix.as_str(), ""));
        entries
            .iter()
            .filter(|entry| {
                entry.file_name().and_then(|n| n.to_str()).is_some_and(|name| {
                    name.len() >= prefix.len() + name_suffix.len()
                        && name.starts_with(prefix.as_str())
                        && name.ends_with(name_suffix)
                })
            })
            .map(|entry| if below.is_empty() { entry.clone() } else { clean(entry.join(below)) })
            .collect()
    }
}

/// One-shot asset-aware trace with fresh caches.
pub async fn trace_with_assets(entry: &Path, options: &TraceOptions) -> Result<AssetTrace> {
    Tracer::new(options.clone())?.trace_with_assets(entry).await
}

/// Dependency requests in source order, without duplicates.
fn dependency_requests(source: &str) -> IndexSet<String> {
    DEPENDENCY
        .captures_iter(source)
        .filter_map(|caps| literal_value(&caps))
        .filter(|request| !request.is_empty())
        .map(str::to_string)
        .collect()
}

/// Candidate assets referenced from a module in `dir`. Quoted paths that are
/// also dependency requests are left to the traversal.
fn asset_candidates(
    source: &str,
    dir: &Path,
    requests: &IndexSet<String>,
) -> Vec<AssetCandidate> {
    let mut found: IndexSet<AssetCandidate> = IndexSet::new();
    let push_relative = |found: &mut IndexSet<AssetCandidate>, rel: &str| {
        let rel = rel.trim_start_matches('/');
        if !rel.is_empty() {
            found.insert(AssetCandidate::Path(clean(dir.join(rel))));
        }
    };

    for caps in DIRNAME_TEMPLATE.captures_iter(source) {
        if let Some(rest) = caps.name("rest") {
            push_relative(&mut found, rest.as_str());
        }
    }
    for caps in INTERPOLATED_TEMPLATE.captures_iter(source) {
        let Some(prefix) = caps.name("dir_prefix").or_else(|| caps.name("rel_prefix")) else {
            continue;
        };
        let suffix = caps.name("suffix").map_or("", |m| m.as_str());
        found.extend(pattern_candidate(dir, prefix.as_str(), suffix));
    }
    for caps in DIRNAME_CONCAT.captures_iter(source) {
        if caps.name("more").is_some() {
            continue;
        }
        if let Some(rel) = literal_value(&caps) {
            push_relative(&mut found, rel);
        }
    }
    for caps in CONCAT_BUILT.captures_iter(source) {
        let Some(head) = named_literal(&caps, "head_sq", "head_dq") else { continue };
        let relative = head.starts_with("./") || head.starts_with("../");
        if caps.name("dirname").is_none() && !relative {
            continue;
        }
        let tail = named_literal(&caps, "tail_sq", "tail_dq").unwrap_or("");
        found.extend(pattern_candidate(dir, head, tail));
    }
    for caps in DIRNAME_JOIN.captures_iter(source) {
        let Some(segments) = caps.name("segments") else { continue };
        let joined: PathBuf = SEGMENT
            .captures_iter(segments.as_str())
            .filter_map(|seg| literal_value(&seg))
            .map(|seg| seg.trim_start_matches('/'))
            .collect();
        if let Some(joined) = joined.to_str() {
            push_relative(&mut found, joined);
        }
    }
    for caps in META_URL.captures_iter(source) {
        if let Some(rel) = literal_value(&caps).filter(|rel| rel.starts_with('.')) {
            push_relative(&mut found, rel);
        }
    }
    for caps in QUOTED_ASSET.captures_iter(source) {
        if let Some(rel) = literal_value(&caps).filter(|rel| !requests.contains(*rel)) {
            push_relative(&mut found, rel);
        }
    }

    found.into_iter().collect()
}

fn named_literal<'h>(caps: &Captures<'h>, single: &str, double: &str) -> Option<&'h str> {
    caps.name(single).or_else(|| caps.name(double)).map(|m| m.as_str())
}

/// Pattern for a path whose static parts are `prefix` and `suffix`. `None`
/// when nothing static narrows down the module's own directory.
fn pattern_candidate(dir: &Path, prefix: &str, suffix: &str) -> Option<AssetCandidate> {
    let rel = prefix.trim_start_matches('/');
    let (sub, name_prefix) = rel.rsplit_once('/').unwrap_or(("", rel));
    if name_prefix.is_empty() && suffix.is_empty() && matches!(sub, "" | ".") {
        return None;
    }
    Some(AssetCandidate::Pattern {
        dir: clean(dir.join(sub)),
        prefix: name_prefix.to_string(),
        suffix: suffix.to_string(),
    })
}
