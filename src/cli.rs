//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// heritage-tally - aggregate cultural-harm datasets into report tables
///
/// Loads CSV exports of looted objects, damaged sites and conflict events,
/// groups them by period, category and location, and writes a research
/// report or chart-ready summary tables.
///
/// Examples:
///   heritage-tally raw_data/stolen_objects_ukraine.csv
///   heritage-tally raw_data/ --format json -o summary.json
///   heritage-tally raw_data/ --format csv -o processed_data/summary
///   heritage-tally acled.csv --delimiter ';' --dry-run
///   heritage-tally --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Dataset files or directories to aggregate
    ///
    /// Directories are scanned for .csv and .tsv files. May be omitted
    /// when datasets are declared in the configuration file.
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Output path for the report
    ///
    /// A file for markdown and json, a directory for csv.
    /// Defaults to heritage_report.md / heritage_summary.json / summary_tables.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json, csv)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Number of locations to list in the ranking
    #[arg(short = 'n', long, value_name = "COUNT", env = "HERITAGE_TALLY_TOP_N")]
    pub top_n: Option<usize>,

    /// Field delimiter for CSV inputs
    ///
    /// Conflict-event exports often use ';'. Files ending in .tsv always use tab.
    #[arg(short, long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Infer missing categories from name/type keywords
    #[arg(long)]
    pub keyword_classify: bool,

    /// Fail if the unknown-date or unclassified-category share exceeds this percentage
    ///
    /// Useful for data-quality checks in scripts. Exit code 2 when exceeded.
    #[arg(long, value_name = "PCT")]
    pub max_unclassified: Option<f64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .heritage-tally.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list datasets and their matched columns without aggregating
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .heritage-tally.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown research report (default)
    #[default]
    Markdown,
    /// JSON document with every aggregate
    Json,
    /// Directory of CSV summary tables
    Csv,
}

impl OutputFormat {
    /// Output path used when neither CLI nor config names one.
    pub fn default_output(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "heritage_report.md",
            OutputFormat::Json => "heritage_summary.json",
            OutputFormat::Csv => "summary_tables",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(max) = self.max_unclassified {
            if !(0.0..=100.0).contains(&max) {
                return Err("Max unclassified share must be between 0 and 100".to_string());
            }
        }

        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                return Err("Delimiter must be a single ASCII character".to_string());
            }
        }

        for input in &self.inputs {
            if !input.exists() {
                return Err(format!("Input does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
