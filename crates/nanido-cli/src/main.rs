mod fetch;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use nanido_core::catalog::CatalogStore;
use nanido_core::config::AppConfig;
use nanido_core::models::PlayMode;
use nanido_core::storage::Storage;
use nanido_import::pipeline::{
    run_catalog_import, run_classification_import, run_label_tidy, run_tier_import, ImportOutcome,
    TierSource,
};

#[derive(Parser)]
#[command(name = "nanido", about = "Rhythm-game catalog tier reconciliation", version)]
struct Cli {
    /// Catalog database path (defaults to the platform data directory).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Populate the catalog from a score-database dump.
    Catalog {
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
        level: u8,
        /// Dump file (JSON with "titles" and "charts" tables).
        #[arg(long)]
        file: PathBuf,
    },
    /// Import tier labels from a wiki page capture.
    Wiki {
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
        level: u8,
        #[arg(long)]
        file: PathBuf,
        /// Miss-log path (defaults to import_misses_<source>_<level>.log).
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Import tier labels from an embedded-JSON tier table.
    TierTable {
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
        level: u8,
        /// Table id inside the payload (e.g. "12_normal").
        #[arg(long)]
        table_id: String,
        /// Local capture; when absent the configured URL is fetched.
        #[arg(long)]
        file: Option<PathBuf>,
        /// URL override for the fetch.
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Import tier labels from a spreadsheet tier sheet.
    TierCsv {
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
        level: u8,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Reclassify console-exclusive songs from a Markdown list.
    ConsoleList {
        #[arg(long)]
        file: PathBuf,
    },
    /// Clear every sub-level label in a level scope.
    Clear {
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
        level: u8,
        /// Restrict to one play mode.
        #[arg(long)]
        mode: Option<ModeArg>,
    },
    /// Rewrite stored sub-level labels to canonical spacing.
    TidyLabels,
    /// Per-level catalog coverage summary.
    Stats,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Sp,
    Dp,
}

impl From<ModeArg> for PlayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sp => PlayMode::Single,
            ModeArg::Dp => PlayMode::Double,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nanido=info,nanido_core=info,nanido_import=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => AppConfig::ensure_db_path()?,
    };
    let store = Storage::open(&db_path)
        .with_context(|| format!("opening catalog database at {}", db_path.display()))?;

    match cli.command {
        Command::Catalog { level, file } => {
            let raw = read_source(&file)?;
            let outcome = run_catalog_import(&store, &config, level, &raw)?;
            println!(
                "catalog level {level}: {} inserted, {} already present",
                outcome.inserted, outcome.existing
            );
        }
        Command::Wiki { level, file, log } => {
            let raw = read_source(&file)?;
            let log = log.unwrap_or_else(|| default_log_path("wiki", level));
            let outcome = run_tier_import(
                &store,
                &config,
                TierSource::Wiki,
                level,
                PlayMode::Single,
                &raw,
                &log,
            )?;
            report(level, &outcome, &log);
        }
        Command::TierTable {
            level,
            table_id,
            file,
            url,
            log,
        } => {
            let raw = match file {
                Some(file) => read_source(&file)?,
                None => {
                    let url = url.as_deref().unwrap_or(&config.tier_table.url);
                    fetch::fetch_document(url).await?
                }
            };
            let log = log.unwrap_or_else(|| default_log_path("tier_table", level));
            let outcome = run_tier_import(
                &store,
                &config,
                TierSource::TierTable {
                    table_id: &table_id,
                },
                level,
                PlayMode::Single,
                &raw,
                &log,
            )?;
            report(level, &outcome, &log);
        }
        Command::TierCsv { level, file, log } => {
            let raw = read_source(&file)?;
            let log = log.unwrap_or_else(|| default_log_path("tier_csv", level));
            let outcome = run_tier_import(
                &store,
                &config,
                TierSource::TierCsv,
                level,
                PlayMode::Single,
                &raw,
                &log,
            )?;
            report(level, &outcome, &log);
        }
        Command::ConsoleList { file } => {
            let raw = read_source(&file)?;
            let outcome = run_classification_import(&store, &raw)?;
            println!(
                "console list: {} reclassified, {} already console, {} not in catalog",
                outcome.updated,
                outcome.unchanged,
                outcome.missed.len()
            );
            for title in &outcome.missed {
                println!("  not found: {title}");
            }
        }
        Command::Clear { level, mode } => {
            let prefix = mode.map(|m| PlayMode::from(m).prefix());
            let cleared = store.clear_sub_levels_in_scope(level, prefix)?;
            println!("cleared {cleared} sub-level labels at level {level}");
        }
        Command::TidyLabels => {
            let updated = run_label_tidy(&store)?;
            println!("tidied {updated} sub-level labels");
        }
        Command::Stats => {
            for summary in store.level_summary()? {
                println!(
                    "level {:>2}: {:>4} charts, {:>4} labeled",
                    summary.level, summary.total, summary.labeled
                );
            }
        }
    }
    Ok(())
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("reading source document {}", path.display()))
}

fn default_log_path(source: &str, level: u8) -> PathBuf {
    PathBuf::from(format!("import_misses_{source}_{level}.log"))
}

fn report(level: u8, outcome: &ImportOutcome, log: &Path) {
    println!(
        "level {level}: {} matched ({} rows changed), {} cleared, {} missed",
        outcome.matched,
        outcome.applied,
        outcome.cleared,
        outcome.missed.len()
    );
    if outcome.missed.is_empty() {
        println!("no misses");
    } else {
        println!("miss log: {}", log.display());
    }
}
