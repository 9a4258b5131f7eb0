//! heritage-tally - aggregate cultural-harm datasets into report tables
//!
//! A CLI tool that loads CSV exports of looted objects, damaged sites and
//! conflict events, groups them by period, category and location, and
//! writes a Markdown report, a JSON summary or a directory of CSV tables.
//!
//! Exit codes:
//!   0 - Success (or no --max-unclassified set)
//!   1 - Runtime error (unreadable input, bad config, write failure, etc.)
//!   2 - Unknown-date or unclassified-category share above --max-unclassified

mod analysis;
mod cli;
mod config;
mod ingest;
mod models;
mod report;
mod scanner;

use analysis::AnalysisOptions;
use anyhow::{bail, Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use ingest::{DatasetSource, KeywordClassifier};
use models::AnalysisSummary;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("heritage-tally v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Aggregation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .heritage-tally.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize column names, keywords, regions and datasets.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete aggregation. Returns exit code (0 or 2).
fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let sources = collect_sources(&args, &config)?;
    if sources.is_empty() {
        bail!("No datasets to aggregate. Pass files or directories, or declare [[datasets]] in the config.");
    }

    if args.dry_run {
        return handle_dry_run(&sources);
    }

    // Step 1: Load every dataset
    if !args.quiet {
        println!("📥 Loading {} dataset(s)...", sources.len());
    }

    let classifier = KeywordClassifier::from(&config.classifier);
    let progress = if !args.quiet && sources.len() > 1 {
        let pb = ProgressBar::new(sources.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut records = Vec::new();
    let mut datasets = Vec::new();
    for source in &sources {
        if let Some(ref pb) = progress {
            pb.set_message(source.name.clone());
        }

        let loaded = ingest::load_dataset(source, &classifier)
            .with_context(|| format!("Failed to load dataset '{}'", source.name))?;
        records.extend(loaded.records);
        datasets.push(loaded.stats);

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    // Step 2: Aggregate
    let options = AnalysisOptions {
        top_n: config.general.top_n,
        regions: config.regions.clone(),
    };
    let mut summary = analysis::summarize(&records, datasets, &options);
    summary.metadata.duration_seconds = start_time.elapsed().as_secs_f64();

    // Step 3: Write the output
    let output = config
        .general
        .output
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(args.format.default_output()));
    write_output(&summary, args.format, &output)?;

    if !args.quiet {
        print_summary(&summary, &output);
    }

    // Check --max-unclassified threshold
    if let Some(max) = config.general.max_unclassified_pct {
        if analysis::exceeds_unclassified(&summary, max) {
            let unknown_dates = summary.time.unclassified_pct();
            let unclassified = summary.categories.unclassified_pct();
            eprintln!(
                "\n⛔ Data quality below threshold: {:.1}% unknown dates, {:.1}% unclassified categories (max {:.1}%). Failing (exit code 2).",
                unknown_dates, unclassified, max
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Datasets declared in the config followed by those found under the CLI inputs.
fn collect_sources(args: &Args, config: &Config) -> Result<Vec<DatasetSource>> {
    let mut sources = config.declared_sources()?;

    if !args.inputs.is_empty() {
        let dataset_scanner = scanner::DatasetScanner::new(scanner::ScanConfig::from(&config.scanner));
        for file in dataset_scanner.scan(&args.inputs)? {
            if sources.iter().any(|s| s.path == file.path) {
                debug!("{} already declared in config", file.path.display());
                continue;
            }
            debug!("Found {} ({} bytes)", file.path.display(), file.size);
            sources.push(config.source_for_path(&file.path)?);
        }
    }

    Ok(sources)
}

/// Render the summary in the chosen format.
fn write_output(summary: &AnalysisSummary, format: OutputFormat, output: &Path) -> Result<()> {
    match format {
        OutputFormat::Markdown => {
            let content = report::generate_markdown_report(summary);
            std::fs::write(output, content)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
        }
        OutputFormat::Json => {
            let content = report::generate_json_report(summary)?;
            std::fs::write(output, content)
                .with_context(|| format!("Failed to write summary to {}", output.display()))?;
        }
        OutputFormat::Csv => {
            let written = report::write_csv_tables(summary, output)?;
            debug!("Wrote {} tables", written.len());
        }
    }

    Ok(())
}

fn print_summary(summary: &AnalysisSummary, output: &Path) {
    println!("\n📊 Aggregate Summary:");
    println!("   Datasets: {}", summary.datasets.len());
    println!("   Records: {}", summary.total_records);
    println!(
        "   Unknown dates: {} ({:.1}%) | Unclassified: {} ({:.1}%)",
        summary.time.unclassified,
        summary.time.unclassified_pct(),
        summary.categories.unclassified,
        summary.categories.unclassified_pct()
    );
    for entry in &summary.time.entries {
        println!("   - {}: {} ({:.1}%)", entry.key, entry.count, entry.percentage);
    }
    if let Some(pct) = summary.escalation_pct {
        println!("   Escalation 2014-2021 → 2022-2025: {:+.1}%", pct);
    }
    if let Some(top) = summary.locations.entries.first() {
        println!("   Top location: {} ({} records)", top.location, top.count);
    }
    println!("   Duration: {:.2}s", summary.metadata.duration_seconds);
    println!("\n✅ Done! Output saved to: {}", output.display());
}

/// Handle --dry-run: list datasets and their column mapping, exit.
fn handle_dry_run(sources: &[DatasetSource]) -> Result<i32> {
    println!("\n🔍 Dry run: inspecting headers (no aggregation)...\n");

    for source in sources {
        println!(
            "   📄 {} ({}, delimiter '{}')",
            source.name,
            source.path.display(),
            source.delimiter as char
        );
        match ingest::inspect_columns(source) {
            Ok(report) => {
                for (field, header) in report.mapped() {
                    println!("      {:<13} {}", field, header.unwrap_or("-"));
                }
                if report.index.is_empty() {
                    println!("      ⚠️  no recognised columns, this dataset would fail to load");
                }
            }
            Err(e) => println!("      ⚠️  {}", e),
        }
    }

    println!("\n   Total: {} dataset(s)", sources.len());
    println!("\n✅ Dry run complete. Nothing was written.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use config::{ColumnOverrides, DatasetConfig};
    use tempfile::TempDir;

    #[test]
    fn test_collect_sources_skips_declared_datasets() {
        let tmp = TempDir::new().unwrap();
        let declared = tmp.path().join("acled.csv");
        let scanned = tmp.path().join("stolen_objects.csv");
        std::fs::write(&declared, "event_date;location\n").unwrap();
        std::fs::write(&scanned, "year_incident,place_incident\n").unwrap();

        let mut config = Config::default();
        config.datasets.push(DatasetConfig {
            name: Some("acled".to_string()),
            path: declared.clone(),
            delimiter: Some(';'),
            keyword_classify: None,
            columns: ColumnOverrides::default(),
        });

        let args = Args::try_parse_from([
            "heritage-tally".to_string(),
            tmp.path().display().to_string(),
        ])
        .unwrap();

        let sources = collect_sources(&args, &config).unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "acled");
        assert_eq!(sources[0].delimiter, b';');
        assert_eq!(sources[1].path, scanned);
        assert_eq!(sources[1].delimiter, b',');
    }

    #[test]
    fn test_collect_sources_without_inputs() {
        let args = Args::try_parse_from(["heritage-tally"]).unwrap();
        let sources = collect_sources(&args, &Config::default()).unwrap();
        assert!(sources.is_empty());
    }
}
