use anyhow::{Context, Result};
use depshake_core::{AssetTrace, Tracer};
use indexmap::IndexSet;
use log::{debug, info};
use serde::Serialize;
use std::path::PathBuf;

use crate::{
    assemble::{AssembleOptions, Assembled, assemble, merge_existing},
    classify::{UsedPackage, collect_packages},
    config::{PruneConfig, TraceConfig},
    project::ProjectManifest,
};

#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    pub entry: PathBuf,
    pub root: PathBuf,
    pub files: IndexSet<PathBuf>,
    pub assets: IndexSet<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PruneReport {
    pub root: PathBuf,
    pub files_traced: usize,
    pub local_files: usize,
    pub packages: Vec<UsedPackage>,
    pub assembled: Assembled,
    /// Where the manifest was written, if anywhere
    pub output: Option<PathBuf>,
    /// The manifest as written, pretty-printed with a trailing newline
    pub rendered: String,
}

pub async fn run_trace(mut cfg: TraceConfig) -> Result<TraceReport> {
    info!("Starting trace");
    cfg.initialize()?;
    let tracer = Tracer::new(cfg.trace_options()?)?;
    let entry = cfg.entry.entry.clone();

    let AssetTrace { files, assets } = if cfg.assets {
        tracer.trace_with_assets(&entry).await
    } else {
        tracer.trace(&entry).await.map(|files| AssetTrace { files, assets: IndexSet::new() })
    }
    .with_context(|| format!("Failed to trace {}", entry.display()))?;
    debug!("Trace reached {} files and {} assets", files.len(), assets.len());

    Ok(TraceReport { entry, root: cfg.entry.root()?.clone(), files, assets })
}

pub async fn run_prune(mut cfg: PruneConfig) -> Result<PruneReport> {
    info!("Starting prune");
    cfg.initialize()?;
    let project = ProjectManifest::load(cfg.manifest()?)?;
    let tracer = Tracer::new(cfg.trace_options()?)?;
    let entry = &cfg.entry.entry;

    let files = tracer
        .trace(entry)
        .await
        .with_context(|| format!("Failed to trace {}", entry.display()))?;
    let (packages, local_files) = collect_packages(&files, tracer.resolver()).await;
    info!("Trace reached {} files in {} packages", files.len(), packages.len());

    let options = AssembleOptions {
        minimal: cfg.minimal,
        preserve: cfg.preserve.clone(),
        include_undeclared: cfg.include_undeclared,
    };
    let assembled = assemble(&project, &packages, &options);

    let manifest = match &cfg.output {
        Some(output) if output.is_file() => {
            debug!("Merging into existing {}", output.display());
            let existing = ProjectManifest::load(output)?;
            merge_existing(existing.fields(), &assembled.manifest)
        }
        _ => assembled.manifest.clone(),
    };
    let mut rendered = serde_json::to_string_pretty(&manifest)?;
    rendered.push('\n');

    if let Some(output) = &cfg.output {
        tokio::fs::write(output, &rendered)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Wrote {}", output.display());
    }

    Ok(PruneReport {
        root: cfg.entry.root()?.clone(),
        files_traced: files.len(),
        local_files,
        packages,
        assembled,
        output: cfg.output.clone(),
        rendered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_file;
    use clap::Parser;
    use serde_json::{Value, json};
    use std::{fs, path::Path};
    use tempfile::TempDir;

    fn fixture(root: &Path) -> PathBuf {
        create_test_file(
            root,
            "package.json",
            r#"{
  "name": "api",
  "version": "2.0.0",
  "scripts": { "test": "jest" },
  "dependencies": { "express": "^4.18.0", "left-pad": "^1.3.0" },
  "devDependencies": { "jest": "^29.0.0" }
}"#,
        );
        create_test_file(
            root,
            "node_modules/express/package.json",
            r#"{"name":"express","version":"4.18.2","main":"index.js"}"#,
        );
        create_test_file(root, "node_modules/express/index.js", "module.exports = require('ms');");
        create_test_file(
            root,
            "node_modules/ms/package.json",
            r#"{"name":"ms","version":"2.1.3"}"#,
        );
        create_test_file(root, "node_modules/ms/index.js", "module.exports = 1;");
        create_test_file(root, "node_modules/left-pad/index.js", "");
        create_test_file(root, "src/routes.js", "export const routes = [];");
        create_test_file(
            root,
            "src/index.js",
            r#"
import express from 'express';
import { routes } from './routes';
import fs from 'node:fs';
"#,
        )
    }

    #[tokio::test]
    async fn test_run_trace_reports_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        let entry = fixture(&root);

        let cfg = TraceConfig::parse_from(["trace", entry.to_str().unwrap()]);
        let report = run_trace(cfg).await.unwrap();

        assert_eq!(report.root, root);
        assert_eq!(report.files.len(), 4);
        assert_eq!(report.files.first(), Some(&entry));
        assert!(report.files.contains(&root.join("node_modules/ms/index.js")));
        assert!(report.assets.is_empty());
    }

    #[tokio::test]
    async fn test_run_prune_to_stdout_keeps_declared_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        let entry = fixture(&root);

        let cfg = PruneConfig::parse_from(["prune", entry.to_str().unwrap()]);
        let report = run_prune(cfg).await.unwrap();

        assert_eq!(report.files_traced, 4);
        assert_eq!(report.local_files, 2);
        assert_eq!(report.output, None);
        let manifest: Value = serde_json::from_str(&report.rendered).unwrap();
        assert_eq!(manifest["dependencies"], json!({ "express": "^4.18.0" }));
        assert_eq!(manifest["scripts"], json!({ "test": "jest" }));
        assert!(manifest.get("devDependencies").is_none());

        let skipped: Vec<&str> = report.assembled.skipped().map(|u| u.name.as_str()).collect();
        assert_eq!(skipped, vec!["ms"]);
        assert_eq!(report.assembled.unused.len(), 1);
        assert_eq!(report.assembled.unused[0].name, "left-pad");
    }

    #[tokio::test]
    async fn test_run_prune_minimal_writes_output() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        let entry = fixture(&root);
        let output = root.join("dist/package.json");
        fs::create_dir_all(root.join("dist")).unwrap();

        let cfg = PruneConfig::parse_from([
            "prune",
            entry.to_str().unwrap(),
            "--minimal",
            "--include-undeclared",
            "--output",
            output.to_str().unwrap(),
        ]);
        let report = run_prune(cfg).await.unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({
                "name": "api",
                "version": "2.0.0",
                "dependencies": { "express": "^4.18.0", "ms": "2.1.3" }
            })
        );
        assert_eq!(report.output, Some(output));
        assert_eq!(report.assembled.emitted(), 2);
    }

    #[tokio::test]
    async fn test_run_prune_merges_into_existing_output() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        let entry = fixture(&root);
        let output = create_test_file(
            &root,
            "out/package.json",
            r#"{"name":"deploy","private":true,"devDependencies":{"x":"1"}}"#,
        );

        let cfg = PruneConfig::parse_from([
            "prune",
            entry.to_str().unwrap(),
            "--minimal",
            "--output",
            output.to_str().unwrap(),
        ]);
        run_prune(cfg).await.unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["name"], json!("api"));
        assert_eq!(written["private"], json!(true));
        assert!(written.get("devDependencies").is_none());
        assert_eq!(written["dependencies"], json!({ "express": "^4.18.0" }));
    }

    #[tokio::test]
    async fn test_run_prune_missing_manifest_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        let entry = create_test_file(&root, "index.js", "");

        let cfg = PruneConfig::parse_from([
            "prune",
            entry.to_str().unwrap(),
            "--manifest",
            root.join("nope.json").to_str().unwrap(),
        ]);
        assert!(run_prune(cfg).await.is_err());
    }
}
