//! racedriver CLI - offline tooling around the race-betting driver

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use racedriver::core::normalize;
use racedriver::scraper::{grid_rows, parse_odds_grid, parse_win_table, win_rows};
use racedriver::submission::validate_batch;
use racedriver::{DriverConfig, LayoutTable, OddsRelation, RawExtraction, WagerRequest, WagerType};

#[derive(Parser)]
#[command(name = "racedriver")]
#[command(author, version, about = "Race-betting UI driver tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the expected combination count of every bet type
    Counts {
        /// Number of runners (2-18)
        #[arg(short, long)]
        field: usize,
    },

    /// Parse a saved odds table and print its rows
    ParseGrid {
        /// Bet type (win, quinella, wide, exacta, trio_box, trio_exact)
        #[arg(short = 't', long)]
        wager_type: WagerType,

        /// Saved markup of the odds table
        #[arg(long)]
        html: PathBuf,

        /// Axis value the grid was rendered for (three-position types)
        #[arg(long)]
        axis: Option<u8>,
    },

    /// Normalize a raw extraction saved as JSON
    Normalize {
        /// Raw extraction JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Write the normalized relation here instead of printing a summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a wager batch without touching a browser
    CheckBatch {
        /// Batch JSON (array of wager requests)
        #[arg(short, long)]
        input: PathBuf,

        /// Driver configuration; the default layout is used without one
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Load and validate a driver configuration
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    match cli.command {
        Commands::Counts { field } => show_counts(field),
        Commands::ParseGrid {
            wager_type,
            html,
            axis,
        } => parse_grid(wager_type, &html, axis),
        Commands::Normalize { input, output } => normalize_file(&input, output.as_deref()),
        Commands::CheckBatch { input, config } => check_batch(&input, config.as_deref()),
        Commands::CheckConfig { config } => check_config(&config),
    }
}

fn show_counts(field: usize) -> Result<()> {
    racedriver::error::validate_field_size(field)?;

    println!("{} {}", "Field size:".yellow().bold(), field);
    println!("{}", "-".repeat(30));
    for wager_type in WagerType::ALL {
        println!(
            "  {:<12} {:>6}",
            wager_type.as_str(),
            wager_type.combination_count(field)
        );
    }
    Ok(())
}

fn parse_grid(wager_type: WagerType, path: &Path, axis: Option<u8>) -> Result<()> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let rows = if wager_type.arity() == 1 {
        win_rows(&parse_win_table(&html)?)
    } else {
        if wager_type.axis_arity() > 0 && axis.is_none() {
            anyhow::bail!("{} grids belong to an axis value, pass --axis", wager_type);
        }
        let grid = parse_odds_grid(&html)?;
        println!(
            "{} {} columns, {} rows",
            "Grid:".green(),
            grid.column_labels.len(),
            grid.row_labels.len()
        );
        grid_rows(&grid, axis.filter(|_| wager_type.axis_arity() > 0))
    };

    println!("{}", format!("{} rows", rows.len()).yellow().bold());
    println!("{}", "-".repeat(30));
    for row in &rows {
        println!("  {:<10} {:>8.1}", selectors_label(&row.selectors), row.odds);
    }
    Ok(())
}

fn normalize_file(input: &Path, output: Option<&Path>) -> Result<()> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let raw: RawExtraction = serde_json::from_str(&content)
        .with_context(|| format!("Invalid raw extraction in {}", input.display()))?;

    let relation = match normalize(&raw) {
        Ok(relation) => relation,
        Err(e) => {
            println!("{} {}", "Normalization failed:".red().bold(), e);
            return Err(e.into());
        }
    };

    match output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&relation)?;
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} {} {} rows to {}",
                "Wrote".green(),
                relation.len(),
                relation.wager_type,
                path.display()
            );
        }
        None => print_relation(&relation),
    }
    Ok(())
}

fn print_relation(relation: &OddsRelation) {
    println!(
        "{} {} over {} runners: {} rows",
        "Relation:".yellow().bold(),
        relation.wager_type,
        relation.field_size,
        relation.len()
    );
    println!("{}", "-".repeat(30));

    let mut by_odds: Vec<_> = relation.rows.iter().collect();
    by_odds.sort_by(|a, b| a.odds.total_cmp(&b.odds));
    for row in by_odds.iter().take(10) {
        println!("  {:<10} {:>8.1}", selectors_label(&row.selectors), row.odds);
    }
    if relation.len() > 10 {
        println!("  {}", format!("... {} more", relation.len() - 10).dimmed());
    }
}

fn check_batch(input: &Path, config: Option<&Path>) -> Result<()> {
    let layout = match config {
        Some(path) => DriverConfig::load(path)?.layout,
        None => LayoutTable::default(),
    };

    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let batch: Vec<WagerRequest> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid wager batch in {}", input.display()))?;

    let groups = match validate_batch(batch, &layout) {
        Ok(groups) => groups,
        Err(e) => {
            println!("{} {}", "Batch rejected:".red().bold(), e);
            return Err(e.into());
        }
    };

    println!("{}", "Submission order:".yellow().bold());
    println!("{}", "-".repeat(40));
    let mut total: u64 = 0;
    for (wager_type, rows) in &groups {
        println!("  {}", wager_type.to_string().cyan());
        for row in rows {
            println!("    {:<10} {:>8}", selectors_label(&row.selections), row.amount);
            total += u64::from(row.amount);
        }
    }
    println!("{}", "-".repeat(40));
    println!("{} {}", "Total stake:".green().bold(), total);
    Ok(())
}

fn check_config(path: &Path) -> Result<()> {
    let config = DriverConfig::load(path)?;

    println!("{} {}", "Config OK:".green().bold(), path.display());
    println!(
        "  timeout {}s, settle {}ms, headless {}",
        config.session.timeout_secs, config.session.settle_ms, config.session.headless
    );
    println!("  entry {}", config.locators.entry_url);
    println!("{}", "Layout:".yellow().bold());
    for wager_type in WagerType::ALL {
        match config.layout.entry(wager_type) {
            Ok(entry) => println!(
                "  {:<12} tab {} sub-tab {}",
                wager_type.as_str(),
                entry.tab_index,
                entry
                    .sub_tab_index
                    .map_or_else(|| "-".to_string(), |i| i.to_string())
            ),
            Err(_) => println!("  {:<12} {}", wager_type.as_str(), "unsupported".dimmed()),
        }
    }
    Ok(())
}

fn selectors_label(selectors: &[u8]) -> String {
    selectors
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
