use std::{
    io::{self, Write},
    path::Path,
};

use colored::Colorize;
use log::debug;

use crate::{
    assemble::{Declaration, PackageUse},
    classify::{PathOrigin, classify_path},
    runner::{PruneReport, TraceReport},
};

/// Path relative to the project root when it lives below it.
fn display_path(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => path.display().to_string(),
    }
}

pub fn print_trace_report<W: Write>(writer: &mut W, report: &TraceReport) -> io::Result<()> {
    debug!("Printing {} files and {} assets", report.files.len(), report.assets.len());
    writeln!(
        writer,
        "{} {} files reachable from {}\n",
        "✓".green().bold(),
        report.files.len().to_string().cyan(),
        display_path(&report.entry, &report.root).blue()
    )?;

    for file in &report.files {
        let shown = display_path(file, &report.root);
        match classify_path(file) {
            PathOrigin::Local => writeln!(writer, "  {}", shown)?,
            PathOrigin::Package { name, .. } => {
                writeln!(writer, "  {} {}", shown.dimmed(), format!("[{}]", name).dimmed())?
            }
        }
    }

    if !report.assets.is_empty() {
        writeln!(writer, "\n{} ({})", "Assets".bold(), report.assets.len().to_string().cyan())?;
        for asset in &report.assets {
            writeln!(writer, "  {}", display_path(asset, &report.root))?;
        }
    }

    writer.flush()?;
    Ok(())
}

pub fn print_trace_json<W: Write>(writer: &mut W, report: &TraceReport) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn print_package<W: Write>(writer: &mut W, package: &PackageUse) -> io::Result<()> {
    let version = package.version.as_deref().unwrap_or("?");
    match (&package.declaration, package.emitted) {
        (Declaration::Declared { section, range }, _) => writeln!(
            writer,
            "  {} {} {} {}",
            "✓".green(),
            package.name.bold(),
            range.cyan(),
            format!("({}, {} installed)", section.key(), version).dimmed()
        ),
        (Declaration::Undeclared, true) => writeln!(
            writer,
            "  {} {} {} {}",
            "+".yellow(),
            package.name.bold(),
            version.cyan(),
            "(undeclared, pinned to installed version)".dimmed()
        ),
        (Declaration::Undeclared, false) => writeln!(
            writer,
            "  {} {} {}",
            "⚠".yellow().bold(),
            package.name.yellow(),
            format!("{} is used but not declared", version).dimmed()
        ),
    }
}

pub fn print_prune_report<W: Write>(writer: &mut W, report: &PruneReport) -> io::Result<()> {
    let assembled = &report.assembled;
    debug!("Printing prune report for {} packages", assembled.used.len());

    writeln!(
        writer,
        "{} {} files traced ({} local), {} packages used\n",
        "✓".green().bold(),
        report.files_traced.to_string().cyan(),
        report.local_files.to_string().cyan(),
        assembled.used.len().to_string().cyan()
    )?;

    for package in &assembled.used {
        print_package(writer, package)?;
    }

    if !assembled.unused.is_empty() {
        writeln!(writer, "\n{}", "Declared but unused".bold())?;
        for unused in &assembled.unused {
            writeln!(
                writer,
                "  {} {} {}",
                "✗".red(),
                unused.name,
                format!("({})", unused.section.key()).dimmed()
            )?;
        }
    }

    let skipped = assembled.skipped().count();
    writeln!(writer, "{}", "─".repeat(60).dimmed())?;
    writeln!(writer, "  Emitted dependencies: {}", assembled.emitted().to_string().green().bold())?;
    writeln!(writer, "  Dropped as unused: {}", assembled.unused.len().to_string().yellow())?;
    if skipped > 0 {
        writeln!(
            writer,
            "  Used but undeclared: {} {}",
            skipped.to_string().red().bold(),
            "(pass --include-undeclared to pin them)".dimmed()
        )?;
    }
    if let Some(output) = &report.output {
        writeln!(writer, "  Wrote {}", display_path(output, &report.root).blue())?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assemble::{Assembled, UnusedDependency},
        project::DependencySection,
    };
    use indexmap::IndexSet;
    use serde_json::{Map, Value};
    use std::path::PathBuf;

    fn plain(bytes: Vec<u8>) -> String {
        colored::control::set_override(false);
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_display_path() {
        let root = Path::new("/project");
        assert_eq!(display_path(Path::new("/project/src/a.ts"), root), "src/a.ts");
        assert_eq!(display_path(Path::new("/elsewhere/b.ts"), root), "/elsewhere/b.ts");
        assert_eq!(display_path(root, root), "/project");
    }

    #[test]
    fn test_trace_json_lists_paths() {
        let report = TraceReport {
            entry: PathBuf::from("/p/index.js"),
            root: PathBuf::from("/p"),
            files: IndexSet::from([PathBuf::from("/p/index.js"), PathBuf::from("/p/a.js")]),
            assets: IndexSet::new(),
        };
        let mut out = Vec::new();
        print_trace_json(&mut out, &report).unwrap();

        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["files"], serde_json::json!(["/p/index.js", "/p/a.js"]));
        assert_eq!(parsed["assets"], serde_json::json!([]));
    }

    #[test]
    fn test_trace_report_lists_relative_paths() {
        colored::control::set_override(false);
        let report = TraceReport {
            entry: PathBuf::from("/p/index.js"),
            root: PathBuf::from("/p"),
            files: IndexSet::from([
                PathBuf::from("/p/index.js"),
                PathBuf::from("/p/node_modules/ms/index.js"),
            ]),
            assets: IndexSet::from([PathBuf::from("/p/view.html")]),
        };
        let mut out = Vec::new();
        print_trace_report(&mut out, &report).unwrap();
        let text = plain(out);

        assert!(text.contains("2 files reachable from index.js"));
        assert!(text.contains("node_modules/ms/index.js [ms]"));
        assert!(text.contains("Assets (1)"));
        assert!(text.contains("  view.html"));
    }

    #[test]
    fn test_prune_report_summary() {
        colored::control::set_override(false);
        let assembled = Assembled {
            manifest: Map::new(),
            used: vec![
                PackageUse {
                    name: "express".into(),
                    version: Some("4.18.2".into()),
                    files: 3,
                    declaration: Declaration::Declared {
                        section: DependencySection::Dependencies,
                        range: "^4.18.0".into(),
                    },
                    emitted: true,
                },
                PackageUse {
                    name: "ms".into(),
                    version: Some("2.1.3".into()),
                    files: 1,
                    declaration: Declaration::Undeclared,
                    emitted: false,
                },
            ],
            unused: vec![UnusedDependency {
                name: "left-pad".into(),
                section: DependencySection::Dependencies,
            }],
        };
        let report = PruneReport {
            root: PathBuf::from("/p"),
            files_traced: 5,
            local_files: 1,
            packages: vec![],
            assembled,
            output: Some(PathBuf::from("/p/dist/package.json")),
            rendered: String::new(),
        };
        let mut out = Vec::new();
        print_prune_report(&mut out, &report).unwrap();
        let text = plain(out);

        assert!(text.contains("5 files traced (1 local), 2 packages used"));
        assert!(text.contains("express ^4.18.0 (dependencies, 4.18.2 installed)"));
        assert!(text.contains("ms 2.1.3 is used but not declared"));
        assert!(text.contains("left-pad (dependencies)"));
        assert!(text.contains("Used but undeclared: 1"));
        assert!(text.contains("Wrote dist/package.json"));
    }
}
