//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.heritage-tally.toml` files.

use crate::ingest::DatasetSource;
use crate::models::RegionRule;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".heritage-tally.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset discovery settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Candidate header names per record field.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Keyword lists for category inference.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Region roll-up rules, first match wins.
    #[serde(default = "default_regions")]
    pub regions: Vec<RegionRule>,

    /// Datasets declared up front, in addition to CLI inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<DatasetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            scanner: ScannerConfig::default(),
            columns: ColumnsConfig::default(),
            classifier: ClassifierConfig::default(),
            regions: default_regions(),
            datasets: Vec::new(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Number of locations in the ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Default field delimiter for CSV inputs.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Infer missing categories from keyword columns.
    #[serde(default)]
    pub keyword_classify: bool,

    /// Fail with exit code 2 above this unknown/unclassified share (percent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unclassified_pct: Option<f64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            top_n: default_top_n(),
            delimiter: default_delimiter(),
            keyword_classify: false,
            max_unclassified_pct: None,
        }
    }
}

fn default_top_n() -> usize {
    5
}

fn default_delimiter() -> char {
    ','
}

/// Dataset discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum datasets to load from directories.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions treated as datasets.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Names to skip while walking directories.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: default_excludes(),
        }
    }
}

fn default_max_files() -> usize {
    50
}

fn default_extensions() -> Vec<String> {
    vec!["csv", "tsv"].into_iter().map(String::from).collect()
}

fn default_excludes() -> Vec<String> {
    vec!["DRAFTS", "inutile", "target", "node_modules", "__pycache__"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Candidate header names for each record field, tried in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_date_columns")]
    pub date: Vec<String>,

    #[serde(default = "default_category_columns")]
    pub category: Vec<String>,

    #[serde(default = "default_location_columns")]
    pub location: Vec<String>,

    #[serde(default = "default_significance_columns")]
    pub significance: Vec<String>,

    /// Free-text columns used for keyword classification.
    #[serde(default = "default_keyword_columns")]
    pub keywords: Vec<String>,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            date: default_date_columns(),
            category: default_category_columns(),
            location: default_location_columns(),
            significance: default_significance_columns(),
            keywords: default_keyword_columns(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_date_columns() -> Vec<String> {
    strings(&["date", "year_incident", "event_date", "incident_date", "year"])
}

fn default_category_columns() -> Vec<String> {
    strings(&["category", "cultural_significance", "object_category", "event_type"])
}

fn default_location_columns() -> Vec<String> {
    strings(&["location", "place_incident", "site", "site_name", "museum", "place"])
}

fn default_significance_columns() -> Vec<String> {
    strings(&["significance", "high_significance", "identity_significance"])
}

fn default_keyword_columns() -> Vec<String> {
    strings(&["name", "object_name", "type", "material", "technique"])
}

/// Per-dataset column overrides. Unset fields fall back to `[columns]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnOverrides {
    pub date: Option<Vec<String>>,
    pub category: Option<Vec<String>>,
    pub location: Option<Vec<String>>,
    pub significance: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
}

impl ColumnOverrides {
    /// Apply these overrides on top of the global column candidates.
    pub fn apply(&self, base: &ColumnsConfig) -> ColumnsConfig {
        let pick = |over: &Option<Vec<String>>, base: &Vec<String>| {
            over.clone().unwrap_or_else(|| base.clone())
        };

        ColumnsConfig {
            date: pick(&self.date, &base.date),
            category: pick(&self.category, &base.category),
            location: pick(&self.location, &base.location),
            significance: pick(&self.significance, &base.significance),
            keywords: pick(&self.keywords, &base.keywords),
        }
    }
}

/// Keyword lists per category, matched case-insensitively as substrings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_religious_keywords")]
    pub religious_identity: Vec<String>,

    #[serde(default = "default_art_keywords")]
    pub national_art: Vec<String>,

    #[serde(default = "default_archaeological_keywords")]
    pub archaeological_heritage: Vec<String>,

    #[serde(default = "default_military_keywords")]
    pub military_history: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            religious_identity: default_religious_keywords(),
            national_art: default_art_keywords(),
            archaeological_heritage: default_archaeological_keywords(),
            military_history: default_military_keywords(),
        }
    }
}

fn default_religious_keywords() -> Vec<String> {
    strings(&["icon", "religious", "orthodox", "church", "cross", "gospel"])
}

fn default_art_keywords() -> Vec<String> {
    strings(&["painting", "graphics", "drawing", "canvas"])
}

fn default_archaeological_keywords() -> Vec<String> {
    strings(&["ceramic", "archaeological", "ancient", "amphora"])
}

fn default_military_keywords() -> Vec<String> {
    strings(&["weapon", "military", "sabre", "sword"])
}

fn default_regions() -> Vec<RegionRule> {
    vec![
        RegionRule::new("Crimea", &["crimea", "sevastopol", "chersonese", "kerch", "panticapaeum"]),
        RegionRule::new("Kherson", &["kherson"]),
        RegionRule::new("Mariupol", &["mariupol"]),
        RegionRule::new("Donetsk", &["donetsk"]),
        RegionRule::new("Luhansk", &["luhansk"]),
        RegionRule::new("Kyiv", &["kyiv", "kiev"]),
    ]
}

/// A dataset declared in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Feed name; defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,

    /// Path to the CSV file.
    pub path: PathBuf,

    /// Field delimiter; defaults to `[general] delimiter` (tab for `.tsv`).
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Infer missing categories; defaults to `[general] keyword_classify`.
    #[serde(default)]
    pub keyword_classify: Option<bool>,

    /// Header overrides for this dataset.
    #[serde(default)]
    pub columns: ColumnOverrides,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(top_n) = args.top_n {
            self.general.top_n = top_n;
        }
        if let Some(delimiter) = args.delimiter {
            self.general.delimiter = delimiter;
        }
        if let Some(max) = args.max_unclassified {
            self.general.max_unclassified_pct = Some(max);
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        // Flags always override
        if args.keyword_classify {
            self.general.keyword_classify = true;
        }
    }

    /// Build a dataset source for a file found on the command line.
    pub fn source_for_path(&self, path: &Path) -> Result<DatasetSource> {
        let is_tsv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
        let delimiter = if is_tsv { '\t' } else { self.general.delimiter };

        Ok(DatasetSource {
            name: dataset_name(path),
            path: path.to_path_buf(),
            delimiter: delimiter_byte(delimiter)?,
            keyword_classify: self.general.keyword_classify,
            columns: self.columns.clone(),
        })
    }

    /// Build the dataset sources declared under `[[datasets]]`.
    pub fn declared_sources(&self) -> Result<Vec<DatasetSource>> {
        self.datasets
            .iter()
            .map(|dataset| {
                let mut source = self.source_for_path(&dataset.path)?;
                if let Some(ref name) = dataset.name {
                    source.name = name.clone();
                }
                if let Some(delimiter) = dataset.delimiter {
                    source.delimiter = delimiter_byte(delimiter)?;
                }
                if let Some(keyword_classify) = dataset.keyword_classify {
                    source.keyword_classify = keyword_classify;
                }
                source.columns = dataset.columns.apply(&self.columns);
                Ok(source)
            })
            .collect()
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Feed name derived from a file path.
pub fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Convert a delimiter character to the single byte the CSV reader wants.
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
    }
    Ok(delimiter as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.top_n, 5);
        assert_eq!(config.general.delimiter, ',');
        assert!(config.scanner.extensions.contains(&"csv".to_string()));
        assert!(config.columns.date.contains(&"year_incident".to_string()));
        assert_eq!(config.regions[0].name, "Crimea");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "report.json"
top_n = 10
keyword_classify = true
max_unclassified_pct = 7.5

[columns]
location = ["site_label"]

[[regions]]
name = "Odesa"
keywords = ["odesa", "odessa"]

[[datasets]]
name = "acled"
path = "raw_data/acled.csv"
delimiter = ";"

[datasets.columns]
date = ["event_date"]
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("report.json"));
        assert_eq!(config.general.top_n, 10);
        assert!(config.general.keyword_classify);
        assert_eq!(config.general.max_unclassified_pct, Some(7.5));
        assert_eq!(config.columns.location, vec!["site_label"]);
        assert!(config.columns.date.contains(&"date".to_string()));
        assert_eq!(config.regions.len(), 1);
        assert_eq!(config.regions[0].name, "Odesa");

        let sources = config.declared_sources().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "acled");
        assert_eq!(sources[0].delimiter, b';');
        assert!(sources[0].keyword_classify);
        assert_eq!(sources[0].columns.date, vec!["event_date"]);
        assert_eq!(sources[0].columns.location, vec!["site_label"]);
    }

    #[test]
    fn test_region_keywords_from_file_ignore_case() {
        let toml_content = r#"
[[regions]]
name = "Odesa"
keywords = ["Odesa"]
"#;
        let config: Config = toml::from_str(toml_content).unwrap();
        let record = Record {
            location: "Odesa Fine Arts Museum".to_string(),
            ..Record::blank("museums")
        };

        let regions = crate::analysis::bucket_by_region(&[record], &config.regions);
        assert_eq!(regions.count(&"Odesa".to_string()), 1);
        assert_eq!(regions.count(&crate::analysis::OTHER_REGION.to_string()), 0);
    }

    #[test]
    fn test_merge_with_args() {
        use clap::Parser;

        let mut config: Config = toml::from_str(
            r#"
[general]
top_n = 8
verbose = true
"#,
        )
        .unwrap();
        let args = crate::cli::Args::try_parse_from([
            "heritage-tally",
            "-n",
            "3",
            "--keyword-classify",
            "--max-unclassified",
            "5",
            "-o",
            "out.json",
        ])
        .unwrap();

        config.merge_with_args(&args);

        assert_eq!(config.general.top_n, 3);
        assert!(config.general.keyword_classify);
        assert_eq!(config.general.max_unclassified_pct, Some(5.0));
        assert_eq!(config.general.output.as_deref(), Some("out.json"));
        assert!(!Config::default_toml().contains("verbose"));
    }

    #[test]
    fn test_source_for_path() {
        let config = Config::default();

        let csv = config.source_for_path(Path::new("data/stolen_objects.csv")).unwrap();
        assert_eq!(csv.name, "stolen_objects");
        assert_eq!(csv.delimiter, b',');

        let tsv = config.source_for_path(Path::new("data/sites.TSV")).unwrap();
        assert_eq!(tsv.delimiter, b'\t');
    }

    #[test]
    fn test_delimiter_byte() {
        assert_eq!(delimiter_byte(';').unwrap(), b';');
        assert!(delimiter_byte('§').is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[columns]"));
        assert!(toml_str.contains("[[regions]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.general.top_n, 5);
        assert_eq!(parsed.regions, Config::default().regions);
    }
}
