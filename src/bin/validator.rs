//! Staging Validator CLI
//!
//! Validates staged delimited files against registered schemas and splits
//! them into accepted and rejected outputs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use glob::Pattern;
use staging_validator::{
    filter_unprocessed, mask_matches, validate_batch, FileLedger, FileStatus, ValidatorConfig,
};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "stage-validator")]
#[command(about = "Validate staged files against destination schemas")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate files and write accepted/rejected partitions
    Validate {
        /// Files or directories to validate
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Check every file against this schema instead of routing by file mask
        #[arg(short, long)]
        schema: Option<String>,

        /// Write partitions here instead of next to each source
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Write a JSON report to this file
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Skip files listed in this processed-files ledger
        #[arg(short, long)]
        ledger: Option<PathBuf>,

        /// Descend into subdirectories
        #[arg(long)]
        recursive: bool,

        /// Exit non-zero when any row is rejected
        #[arg(long)]
        fail_on_reject: bool,
    },

    /// List registered schemas
    Schemas,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the run counts as a success
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = ValidatorConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    let registry = config.build_registry()?;

    match cli.command {
        Commands::Validate {
            paths,
            schema,
            out_dir,
            report,
            ledger,
            recursive,
            fail_on_reject,
        } => {
            let mut options = config.split_options()?;
            if out_dir.is_some() {
                options.output_dir = out_dir;
            }

            let outputs = [options.accepted_prefix.as_str(), options.rejected_prefix.as_str()];
            let mut files = expand_paths(&paths, &config.input.file_masks, &outputs, recursive)?;
            if let Some(ledger_path) = ledger {
                let before = files.len();
                files = filter_unprocessed(&files, &FileLedger::new(ledger_path))?;
                println!("⏭️  Skipping {} already processed file(s)", before - files.len());
            }

            if files.is_empty() {
                println!("💡 No files to validate");
                return Ok(true);
            }

            println!("🔍 Validating {} file(s)...", files.len());
            let batch = validate_batch(&files, &registry, &options, schema.as_deref())?;

            for file in &batch.files {
                match file {
                    FileStatus::Validated(r) if r.layout_ok => {
                        let icon = if r.rejected == 0 { "✅" } else { "⚠️ " };
                        println!(
                            "  {} {} [{}] - {} accepted, {} rejected",
                            icon,
                            r.source.display(),
                            r.schema,
                            r.accepted,
                            r.rejected
                        );
                    }
                    FileStatus::Validated(r) => {
                        println!("  ❌ {} [{}] - layout mismatch", r.source.display(), r.schema);
                        if let Some(mismatch) = &r.layout_mismatch {
                            println!("     Expected: {:?}", mismatch.expected);
                            println!("     Found:    {:?}", mismatch.found);
                        }
                    }
                    FileStatus::Failed { source, error } => {
                        println!("  ❌ {} - {}", source.display(), error);
                    }
                }
            }

            let totals = batch.totals;
            println!();
            println!(
                "📊 {} file(s): {} accepted row(s), {} rejected row(s), {} layout failure(s), {} error(s)",
                totals.files,
                totals.accepted_rows,
                totals.rejected_rows,
                totals.layout_failures,
                totals.failed
            );

            if let Some(path) = report {
                std::fs::write(&path, batch.to_json()?)
                    .with_context(|| format!("failed to write report {:?}", path))?;
                println!("✅ Report written to {:?}", path);
            }

            Ok(!(batch.has_failures() || (fail_on_reject && batch.has_rejects())))
        }

        Commands::Schemas => {
            if registry.is_empty() {
                println!("💡 No schemas registered (looked in {:?})", config.registry_path());
                return Ok(true);
            }

            println!("📋 Registered schemas\n");
            for entry in registry.entries() {
                println!("{} (masks: {:?})", entry.spec.name(), entry.masks());
                for column in entry.spec.columns() {
                    let null = if column.nullable { "null" } else { "not null" };
                    println!("  - {}: {} {}", column.name, column.logical_type, null);
                }
            }
            Ok(true)
        }
    }
}

/// Expand directories into the files matching the input masks
///
/// Files carrying an output prefix are earlier partitions and are skipped.
fn expand_paths(
    paths: &[PathBuf],
    masks: &[String],
    output_prefixes: &[&str],
    recursive: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let patterns = masks
        .iter()
        .map(|m| Pattern::new(m).with_context(|| format!("invalid input mask {:?}", m)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            bail!("{:?} does not exist", path);
        }

        let depth = if recursive { usize::MAX } else { 1 };
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .max_depth(depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| matches_any(p, &patterns) && !is_output(p, output_prefixes))
            .collect();
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

fn matches_any(path: &Path, patterns: &[Pattern]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    patterns.iter().any(|p| mask_matches(p, name))
}

fn is_output(path: &Path, prefixes: &[&str]) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| prefixes.iter().any(|prefix| name.starts_with(prefix)))
}
