//! Command-line entry point.
//!
//! ```text
//! apbc_optimizer <tasks.csv> [--config apbc.toml] [--out DIR]
//! ```
//!
//! Reads a maintenance task list, clusters the task intervals into checks,
//! prints the group summary and writes the workbook, summary CSV and
//! execution log to the output directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use apbc_optimizer::analysis::{self, summary};
use apbc_optimizer::config::Settings;
use apbc_optimizer::export;
use apbc_optimizer::ingest::tasks;

const DEFAULT_CONFIG_FILE: &str = "apbc.toml";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Args {
    /// CSV export of the maintenance task list
    #[arg(value_name = "TASKS_CSV")]
    input: PathBuf,

    /// Path to settings TOML (defaults to ./apbc.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory (overrides settings)
    #[arg(long)]
    out: Option<PathBuf>,
}

fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(path) => Some(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Some(Path::new(DEFAULT_CONFIG_FILE)),
        None => None,
    };
    let settings = match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    settings
        .apply_env()
        .context("applying APBC_* environment overrides")
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Args::parse();
    let settings = load_settings(cli.config.as_deref())?;

    let list = tasks::read_task_csv(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let stats = list.stats();
    println!(
        "📊 {}: {}/{} tasks with a valid interval ({} ATA chapters)",
        cli.input.display(),
        stats.valid_tasks,
        stats.total_tasks,
        stats.ata_count
    );
    println!(
        "   EFH min {:.0} / median {:.0} / mean {:.0} / max {:.0}",
        stats.min_efh, stats.median_efh, stats.mean_efh, stats.max_efh
    );

    let result = analysis::fit(&list.valid_tasks(), &settings.optimizer)?;
    print_summary(&result);

    let out_dir = cli
        .out
        .unwrap_or_else(|| PathBuf::from(&settings.output.dir));
    let paths = export::write_all(&result, &out_dir, &settings.output.log_file)
        .with_context(|| format!("writing results to {}", out_dir.display()))?;
    println!("\n📁 Results written:");
    println!("   {}", paths.workbook.display());
    println!("   {}", paths.summary_csv.display());
    println!("   {}", paths.log.display());

    Ok(())
}

fn print_summary(result: &analysis::FitResult) {
    let metrics = summary::summary_metrics(result);
    let rule = "═".repeat(70);

    println!("\n{}", rule);
    println!("📊 CHECK GROUP SUMMARY");
    println!("{}", rule);
    println!(
        "Groups: {}   In-group: {}/{} ({:.1}%)   Nested: {} ({:.1}% reduction)",
        metrics.num_groups,
        metrics.in_group_count,
        metrics.total_tasks,
        metrics.in_group_rate,
        metrics.num_nested,
        metrics.reduction_rate
    );
    println!();
    println!(
        "{:>5}  {:>10}  {:>7}  {:>8}  {:>8}  {}",
        "Group", "Center EFH", "Tasks", "Avg dev%", "Max dev%", "Nested"
    );
    for row in summary::get_summary(result) {
        println!(
            "{:>5}  {:>10.0}  {:>7}  {:>8.2}  {:>8.2}  {}",
            format!("G{}", row.group_id),
            row.center,
            row.task_count,
            row.mean_deviation_pct,
            row.max_deviation_pct,
            if row.is_nested_small { "✓" } else { "" }
        );
    }

    if !result.nested_chains.is_empty() {
        println!("\nNested chains:");
        for chain in &result.nested_chains {
            println!("   {}", export::chain_label(chain));
        }
    }
    println!("{}", rule);
}
