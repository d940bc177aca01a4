use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use depshake_prune::{PruneConfig, TraceConfig};
use log::{debug, info};
use std::io::{BufWriter, Write};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "depshake")]
#[command(about = "Trace the files a JavaScript/TypeScript entry point needs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every file reachable from an entry file
    Trace(TraceConfig),
    /// Write a package.json declaring only the packages an entry file uses
    Prune(PruneConfig),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();

    match cli.command {
        Commands::Trace(cfg) => {
            info!(
                "Tracing from {} (concurrency {})",
                cfg.entry.entry.display(),
                cfg.entry.concurrency
            );
            let json = cfg.json;
            let report = depshake_prune::run_trace(cfg).await?;
            let elapsed_ms = start.elapsed().as_millis();

            if json {
                depshake_prune::print_trace_json(&mut stdout, &report)?;
                return Ok(());
            }
            depshake_prune::print_trace_report(&mut stdout, &report)?;
            writeln!(
                stdout,
                "\n{} Finished in {}ms on {} files.",
                "●".bright_blue(),
                elapsed_ms.to_string().cyan(),
                report.files.len().to_string().cyan()
            )?;
            stdout.flush()?;
            Ok(())
        }
        Commands::Prune(cfg) => {
            info!("Pruning dependencies for {}", cfg.entry.entry.display());
            let report = depshake_prune::run_prune(cfg).await?;
            let elapsed_ms = start.elapsed().as_millis();

            // Without --output the manifest owns stdout, so the summary goes to stderr.
            let mut summary: Box<dyn Write + '_> = if report.output.is_some() {
                Box::new(&mut stdout)
            } else {
                stdout.write_all(report.rendered.as_bytes())?;
                stdout.flush()?;
                Box::new(std::io::stderr())
            };
            depshake_prune::print_prune_report(&mut summary, &report)?;
            writeln!(
                summary,
                "\n{} Finished in {}ms on {} files.",
                "●".bright_blue(),
                elapsed_ms.to_string().cyan(),
                report.files_traced.to_string().cyan()
            )?;
            summary.flush()?;
            drop(summary);

            if report.assembled.skipped().next().is_some() {
                // Non-zero exit to fail CI
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
