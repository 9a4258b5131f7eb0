//! Data models for the cultural-harm aggregator.
//!
//! This module contains the record shape every source dataset is mapped
//! onto, the fixed time buckets and category set, and the aggregate views
//! produced from them.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Last calendar year covered by the analysis.
pub const ANALYSIS_END_YEAR: i32 = 2025;

/// Fixed calendar ranges used for the temporal escalation view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeBucket {
    /// Everything dated before 2014.
    #[serde(rename = "pre-2014")]
    Pre2014,
    /// From the annexation of Crimea up to the full-scale invasion.
    #[serde(rename = "2014-2021")]
    Annexation,
    /// Full-scale invasion period.
    #[serde(rename = "2022-2025")]
    Invasion,
}

impl TimeBucket {
    /// All buckets in report order.
    pub const ALL: [TimeBucket; 3] = [TimeBucket::Pre2014, TimeBucket::Annexation, TimeBucket::Invasion];

    /// Returns the bucket a year falls into, or `None` past the analyzed period.
    pub fn for_year(year: i32) -> Option<Self> {
        match year {
            y if y > ANALYSIS_END_YEAR => None,
            y if y < 2014 => Some(TimeBucket::Pre2014),
            y if y < 2022 => Some(TimeBucket::Annexation),
            _ => Some(TimeBucket::Invasion),
        }
    }

    /// Short label used in tables.
    pub fn label(&self) -> &'static str {
        match self {
            TimeBucket::Pre2014 => "Pre-2014",
            TimeBucket::Annexation => "2014-2021",
            TimeBucket::Invasion => "2022-2025",
        }
    }

    /// Machine-readable identifier, matching the serialized form.
    pub fn slug(&self) -> &'static str {
        match self {
            TimeBucket::Pre2014 => "pre-2014",
            TimeBucket::Annexation => "2014-2021",
            TimeBucket::Invasion => "2022-2025",
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Cultural category of a looted object or damaged site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    NationalArt,
    ArchaeologicalHeritage,
    ReligiousIdentity,
    MilitaryHistory,
    /// Catch-all for anything the curators labelled differently.
    Other,
}

impl Category {
    /// All categories in enumeration order.
    pub const ALL: [Category; 5] = [
        Category::NationalArt,
        Category::ArchaeologicalHeritage,
        Category::ReligiousIdentity,
        Category::MilitaryHistory,
        Category::Other,
    ];

    /// Machine-readable identifier, matching the serialized form.
    pub fn slug(&self) -> &'static str {
        match self {
            Category::NationalArt => "national-art",
            Category::ArchaeologicalHeritage => "archaeological-heritage",
            Category::ReligiousIdentity => "religious-identity",
            Category::MilitaryHistory => "military-history",
            Category::Other => "other",
        }
    }

    /// Whether objects of this category carry national identity by default.
    pub fn is_identity_bearing(&self) -> bool {
        matches!(self, Category::NationalArt | Category::ReligiousIdentity)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::NationalArt => write!(f, "National art"),
            Category::ArchaeologicalHeritage => write!(f, "Archaeological heritage"),
            Category::ReligiousIdentity => write!(f, "Religious/identity"),
            Category::MilitaryHistory => write!(f, "Military history"),
            Category::Other => write!(f, "Other"),
        }
    }
}

/// Unrecognized labels map to [`Category::Other`]; the source data is
/// hand-curated and labels drift between feeds.
impl From<&str> for Category {
    fn from(s: &str) -> Self {
        let normalized = s
            .to_lowercase()
            .replace(['_', '-', '/'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "national art" | "art" | "fine art" | "painting" | "paintings" | "graphics"
            | "arte nacional" => Category::NationalArt,
            "archaeological heritage" | "archaeological" | "archaeology" | "archaeological site"
            | "patrimonio arqueológico" | "patrimonio arqueologico" => {
                Category::ArchaeologicalHeritage
            }
            "religious identity" | "religious" | "identity" | "religious heritage"
            | "religioso identitario" => Category::ReligiousIdentity,
            "military history" | "military" | "weapons" | "historia militar" => {
                Category::MilitaryHistory
            }
            _ => Category::Other,
        }
    }
}

/// How strongly an object or site is tied to national cultural identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    High,
    Low,
    Unknown,
}

impl Significance {
    /// All levels in report order.
    pub const ALL: [Significance; 3] = [Significance::High, Significance::Low, Significance::Unknown];

    /// Fallback used when a dataset carries no significance column.
    pub fn inferred(category: Option<Category>) -> Self {
        match category {
            Some(c) if c.is_identity_bearing() => Significance::High,
            Some(_) => Significance::Low,
            None => Significance::Unknown,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Significance::High => "high",
            Significance::Low => "low",
            Significance::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Significance::High => write!(f, "High"),
            Significance::Low => write!(f, "Low"),
            Significance::Unknown => write!(f, "Unknown"),
        }
    }
}

impl From<&str> for Significance {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "true" | "yes" | "y" | "1" | "1.0" => Significance::High,
            "low" | "false" | "no" | "n" | "0" | "0.0" => Significance::Low,
            _ => Significance::Unknown,
        }
    }
}

/// Date of an incident as far as the source could tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RecordDate {
    /// Full calendar date.
    Day(NaiveDate),
    /// Only the year is known.
    Year(i32),
    /// Field was empty or an explicit placeholder.
    Unknown,
    /// Field had text but no recognizable date in it.
    Malformed(String),
}

impl RecordDate {
    /// Returns the year, if one could be determined.
    pub fn year(&self) -> Option<i32> {
        match self {
            RecordDate::Day(d) => Some(d.year()),
            RecordDate::Year(y) => Some(*y),
            RecordDate::Unknown | RecordDate::Malformed(_) => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, RecordDate::Malformed(_))
    }

    /// Returns the time bucket, or `None` for undated and out-of-period records.
    pub fn bucket(&self) -> Option<TimeBucket> {
        self.year().and_then(TimeBucket::for_year)
    }
}

/// One row of curated source data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// When the incident happened.
    pub date: RecordDate,
    /// Category, absent when the source left it blank.
    pub category: Option<Category>,
    /// Site or institution name, trimmed. Empty when missing.
    pub location: String,
    /// Significance to national identity.
    pub significance: Significance,
    /// Name of the feed this row came from.
    pub source_dataset: String,
    /// Free text (name, type) used for keyword classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Record {
    /// Creates a record with every field unknown.
    pub fn blank(source_dataset: &str) -> Self {
        Self {
            date: RecordDate::Unknown,
            category: None,
            location: String::new(),
            significance: Significance::Unknown,
            source_dataset: source_dataset.to_string(),
            description: None,
        }
    }

    /// Grouping key for the location, `None` when the location is empty.
    pub fn location_key(&self) -> Option<String> {
        let key = normalize_location(&self.location);
        (!key.is_empty()).then_some(key)
    }
}

/// Case-folds and collapses whitespace so spelling variants share a key.
pub fn normalize_location(location: &str) -> String {
    location
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Named keyword rule that rolls many locations into one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRule {
    /// Region label shown in reports.
    pub name: String,
    /// Lower-case fragments; any match assigns the region.
    pub keywords: Vec<String>,
}

impl RegionRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Checks whether a normalized location belongs to this region.
    ///
    /// Keywords loaded from a config file keep their original case, so they
    /// are lowercased here rather than trusted.
    pub fn matches(&self, normalized_location: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| normalized_location.contains(k.to_lowercase().as_str()))
    }
}

/// One row of an aggregate view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEntry<K> {
    pub key: K,
    pub count: usize,
    /// Share of the classified records, 0-100.
    pub percentage: f64,
}

/// Counts and percentages for one grouping dimension.
///
/// `unclassified` holds the records that could not be placed in any key
/// (unknown date, missing category, empty location). Percentages are
/// computed over `classified` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult<K> {
    pub entries: Vec<AggregateEntry<K>>,
    pub classified: usize,
    pub unclassified: usize,
}

impl<K> AggregateResult<K> {
    /// Builds a result from ordered `(key, count)` pairs.
    pub fn from_counts(counts: Vec<(K, usize)>, unclassified: usize) -> Self {
        let classified: usize = counts.iter().map(|(_, c)| c).sum();
        let entries = counts
            .into_iter()
            .map(|(key, count)| AggregateEntry {
                key,
                count,
                percentage: percentage(count, classified),
            })
            .collect();

        Self {
            entries,
            classified,
            unclassified,
        }
    }

    /// Total number of records seen, classified or not.
    pub fn total(&self) -> usize {
        self.classified + self.unclassified
    }

    /// Share of all records that ended up unclassified, 0-100.
    pub fn unclassified_pct(&self) -> f64 {
        percentage(self.unclassified, self.total())
    }
}

impl<K: PartialEq> AggregateResult<K> {
    /// Count for a key, 0 when absent.
    pub fn count(&self, key: &K) -> usize {
        self.entries
            .iter()
            .find(|e| &e.key == key)
            .map_or(0, |e| e.count)
    }

    /// Percentage for a key, 0 when absent.
    pub fn percentage(&self, key: &K) -> f64 {
        self.entries
            .iter()
            .find(|e| &e.key == key)
            .map_or(0.0, |e| e.percentage)
    }
}

/// `part` as a percentage of `whole`; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// A location and how many records point at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCount {
    /// First spelling seen in the data, trimmed.
    pub location: String,
    pub count: usize,
    /// Share of records with a non-empty location, 0-100.
    pub percentage: f64,
}

/// Top-N locations plus what did not make the cut.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRanking {
    pub entries: Vec<LocationCount>,
    /// Records at locations outside the top N.
    pub remainder: usize,
    /// Records with an empty location.
    pub unclassified: usize,
    /// Number of distinct normalized locations.
    pub distinct_locations: usize,
}

impl LocationRanking {
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum::<usize>() + self.remainder + self.unclassified
    }
}

/// Record count for a single year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub count: usize,
}

/// Category breakdown within one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabRow {
    pub bucket: TimeBucket,
    /// Category counts, percentages relative to this row.
    pub categories: AggregateResult<Category>,
}

/// Significance levels within one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceRow {
    pub bucket: TimeBucket,
    /// Level counts, percentages relative to this row.
    pub levels: AggregateResult<Significance>,
}

impl SignificanceRow {
    /// Share of this period's records tied to national identity, 0-100.
    pub fn high_share(&self) -> f64 {
        self.levels.percentage(&Significance::High)
    }
}

/// Per-year record counts for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionYearRow {
    pub region: String,
    /// One entry per year of the matrix, zeros included.
    pub years: Vec<YearCount>,
}

impl RegionYearRow {
    pub fn total(&self) -> usize {
        self.years.iter().map(|y| y.count).sum()
    }
}

/// Per-feed load statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    /// Name of the feed.
    pub name: String,
    /// File it was read from.
    pub path: String,
    /// Number of records produced.
    pub records: usize,
    /// Rows whose date text could not be read.
    pub malformed_dates: usize,
    /// Rows without a category.
    pub missing_categories: usize,
    /// Rows without a location.
    pub missing_locations: usize,
    /// Rows the CSV reader could not split; kept as blank records.
    pub unreadable_rows: usize,
}

impl DatasetStats {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// Accounts for one loaded record.
    pub fn observe(&mut self, record: &Record) {
        self.records += 1;
        if record.date.is_malformed() {
            self.malformed_dates += 1;
        }
        if record.category.is_none() {
            self.missing_categories += 1;
        }
        if record.location.is_empty() {
            self.missing_locations += 1;
        }
    }
}

/// Metadata about a single aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// When the summary was produced.
    pub generated_at: DateTime<Utc>,
    /// Input files that were aggregated.
    pub inputs: Vec<String>,
    /// Size of the location ranking.
    pub top_n: usize,
    /// Wall-clock duration of load plus aggregation.
    pub duration_seconds: f64,
}

/// Every aggregate view for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub metadata: RunMetadata,
    pub datasets: Vec<DatasetStats>,
    pub total_records: usize,
    /// Records whose date text could not be parsed (subset of the unknown-date bin).
    pub malformed_dates: usize,
    pub time: AggregateResult<TimeBucket>,
    /// Percent change of 2022-2025 over 2014-2021.
    pub escalation_pct: Option<f64>,
    pub categories: AggregateResult<Category>,
    pub significance: AggregateResult<Significance>,
    pub locations: LocationRanking,
    pub regions: AggregateResult<String>,
    pub sources: AggregateResult<String>,
    pub timeline: Vec<YearCount>,
    pub crosstab: Vec<CrosstabRow>,
    pub significance_by_period: Vec<SignificanceRow>,
    /// Region by year matrix over records with both a location and a year.
    pub region_years: Vec<RegionYearRow>,
    /// Records whose location names a museum.
    pub museum_records: usize,
}
