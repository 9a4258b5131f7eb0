//! Source adapters: CSV rows to [`Record`]s.
//!
//! Each dataset is read with a column mapping made of candidate header
//! names. A row never fails to load: missing or unreadable fields turn
//! into unknown values that the aggregator counts separately.

pub mod classify;
pub mod dates;
pub mod error;

pub use classify::KeywordClassifier;
pub use error::LoadError;

use crate::config::ColumnsConfig;
use crate::models::{Category, DatasetStats, Record, Significance};
use csv::{ByteRecord, ReaderBuilder};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A dataset to load and how to read it.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    /// Feed name recorded on every record.
    pub name: String,
    /// CSV file path.
    pub path: PathBuf,
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Infer missing categories from keyword columns.
    pub keyword_classify: bool,
    /// Candidate header names per field.
    pub columns: ColumnsConfig,
}

/// Records loaded from one dataset.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub records: Vec<Record>,
    pub stats: DatasetStats,
}

/// Header positions for each record field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnIndex {
    pub date: Option<usize>,
    pub category: Option<usize>,
    pub location: Option<usize>,
    pub significance: Option<usize>,
    pub keywords: Vec<usize>,
}

impl ColumnIndex {
    /// Match headers against candidate names, case-insensitively.
    ///
    /// For each field the first candidate present in the header row wins.
    pub fn resolve(headers: &[String], columns: &ColumnsConfig) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let find = |candidates: &[String]| {
            candidates.iter().find_map(|candidate| {
                let candidate = candidate.to_lowercase();
                lowered.iter().position(|h| *h == candidate)
            })
        };

        let mut keywords = Vec::new();
        for candidate in &columns.keywords {
            let candidate = candidate.to_lowercase();
            if let Some(idx) = lowered.iter().position(|h| *h == candidate) {
                if !keywords.contains(&idx) {
                    keywords.push(idx);
                }
            }
        }

        Self {
            date: find(&columns.date),
            category: find(&columns.category),
            location: find(&columns.location),
            significance: find(&columns.significance),
            keywords,
        }
    }

    /// True when no field could be mapped.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.category.is_none()
            && self.location.is_none()
            && self.significance.is_none()
            && self.keywords.is_empty()
    }

    /// Build a record from one row.
    fn build_record(
        &self,
        row: &ByteRecord,
        source: &DatasetSource,
        classifier: &KeywordClassifier,
    ) -> Record {
        let date = dates::parse_date(&field(row, self.date));

        let description = self
            .keywords
            .iter()
            .map(|idx| field(row, Some(*idx)))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let description = (!description.is_empty()).then_some(description);

        let category_text = field(row, self.category);
        let category = if !dates::is_placeholder(&category_text) {
            Some(Category::from(category_text.as_str()))
        } else if source.keyword_classify {
            description.as_deref().map(|text| classifier.classify(text))
        } else {
            None
        };

        let significance = match self.significance {
            Some(_) => Significance::from(field(row, self.significance).as_str()),
            None => Significance::inferred(category),
        };

        let location = field(row, self.location);
        let location = if dates::is_placeholder(&location) {
            String::new()
        } else {
            location
        };

        Record {
            date,
            category,
            location,
            significance,
            source_dataset: source.name.clone(),
            description,
        }
    }
}

/// Trimmed, lossily decoded cell; empty when the column or cell is missing.
fn field(row: &ByteRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| row.get(i))
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .unwrap_or_default()
}

fn reader_for<R: Read>(source: &DatasetSource, reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(source.delimiter)
        .flexible(true)
        .from_reader(reader)
}

fn read_headers<R: Read>(
    source: &DatasetSource,
    rdr: &mut csv::Reader<R>,
) -> Result<Vec<String>, LoadError> {
    let headers = rdr.byte_headers().map_err(|e| LoadError::Csv {
        path: source.path.clone(),
        source: e,
    })?;

    Ok(headers
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_string()
        })
        .collect())
}

/// Load a dataset from its file.
pub fn load_dataset(
    source: &DatasetSource,
    classifier: &KeywordClassifier,
) -> Result<LoadedDataset, LoadError> {
    info!("Loading dataset '{}' from {}", source.name, source.path.display());

    let file = File::open(&source.path).map_err(|e| LoadError::Io {
        path: source.path.clone(),
        source: e,
    })?;

    load_from_reader(source, file, classifier)
}

/// Load a dataset from any reader.
pub fn load_from_reader<R: Read>(
    source: &DatasetSource,
    reader: R,
    classifier: &KeywordClassifier,
) -> Result<LoadedDataset, LoadError> {
    let mut rdr = reader_for(source, reader);
    let headers = read_headers(source, &mut rdr)?;
    let index = ColumnIndex::resolve(&headers, &source.columns);

    if index.is_empty() {
        return Err(LoadError::NoUsableColumns {
            path: source.path.clone(),
            headers: headers.join(", "),
        });
    }
    debug!("Column mapping for '{}': {:?}", source.name, index);

    let mut stats = DatasetStats::new(&source.name, &source.path.display().to_string());
    let mut records = Vec::new();
    let mut row = ByteRecord::new();

    loop {
        match rdr.read_byte_record(&mut row) {
            Ok(true) => {
                let record = index.build_record(&row, source, classifier);
                stats.observe(&record);
                records.push(record);
            }
            Ok(false) => break,
            Err(e) if e.is_io_error() => {
                return Err(LoadError::Csv {
                    path: source.path.clone(),
                    source: e,
                });
            }
            Err(e) => {
                warn!("Unreadable row in '{}': {}", source.name, e);
                let record = Record::blank(&source.name);
                stats.unreadable_rows += 1;
                stats.observe(&record);
                records.push(record);
            }
        }
    }

    info!(
        "Loaded {} records from '{}' ({} malformed dates, {} without category, {} without location)",
        stats.records,
        source.name,
        stats.malformed_dates,
        stats.missing_categories,
        stats.missing_locations
    );

    Ok(LoadedDataset { records, stats })
}

/// Header names and which of them each record field would use.
#[derive(Debug, Clone)]
pub struct ColumnReport {
    pub headers: Vec<String>,
    pub index: ColumnIndex,
}

impl ColumnReport {
    /// `(field, header)` pairs for display.
    pub fn mapped(&self) -> Vec<(&'static str, Option<&str>)> {
        let name = |idx: Option<usize>| idx.and_then(|i| self.headers.get(i)).map(String::as_str);

        let keywords = self
            .index
            .keywords
            .first()
            .and_then(|i| self.headers.get(*i))
            .map(String::as_str);

        vec![
            ("date", name(self.index.date)),
            ("category", name(self.index.category)),
            ("location", name(self.index.location)),
            ("significance", name(self.index.significance)),
            ("keywords", keywords),
        ]
    }
}

/// Read only the header row and resolve the column mapping.
pub fn inspect_columns(source: &DatasetSource) -> Result<ColumnReport, LoadError> {
    let file = File::open(&source.path).map_err(|e| LoadError::Io {
        path: source.path.clone(),
        source: e,
    })?;
    let mut rdr = reader_for(source, file);
    let headers = read_headers(source, &mut rdr)?;
    let index = ColumnIndex::resolve(&headers, &source.columns);

    Ok(ColumnReport { headers, index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordDate, TimeBucket};
    use std::io::Write;

    const STOLEN_SAMPLE: &str = include_str!("../../fixtures/stolen_objects_sample.csv");
    const ACLED_SAMPLE: &str = include_str!("../../fixtures/acled_events_sample.csv");

    fn source(name: &str, delimiter: u8, keyword_classify: bool) -> DatasetSource {
        DatasetSource {
            name: name.to_string(),
            path: PathBuf::from(format!("{}.csv", name)),
            delimiter,
            keyword_classify,
            columns: ColumnsConfig::default(),
        }
    }

    #[test]
    fn test_load_stolen_objects_sample() {
        let src = source("stolen-objects", b',', false);
        let loaded =
            load_from_reader(&src, STOLEN_SAMPLE.as_bytes(), &KeywordClassifier::default())
                .unwrap();

        assert_eq!(loaded.records.len(), 8);
        assert_eq!(loaded.stats.records, 8);

        let first = &loaded.records[0];
        assert_eq!(first.date, RecordDate::Year(2022));
        assert_eq!(first.category, Some(Category::NationalArt));
        assert_eq!(
            first.location,
            "The Oleksii Shovkunenko Kherson Regional Art Museum"
        );
        assert_eq!(first.source_dataset, "stolen-objects");
        assert_eq!(first.significance, Significance::High);

        // blank category stays unclassified without keyword inference
        assert_eq!(loaded.stats.missing_categories, 1);
        assert_eq!(loaded.stats.missing_locations, 1);
        assert_eq!(loaded.stats.malformed_dates, 1);
    }

    #[test]
    fn test_keyword_classification_fills_missing_category() {
        let src = source("stolen-objects", b',', true);
        let loaded =
            load_from_reader(&src, STOLEN_SAMPLE.as_bytes(), &KeywordClassifier::default())
                .unwrap();

        assert_eq!(loaded.stats.missing_categories, 0);
        let icon = loaded
            .records
            .iter()
            .find(|r| r.description.as_deref().is_some_and(|d| d.contains("Icon")))
            .unwrap();
        assert_eq!(icon.category, Some(Category::ReligiousIdentity));
    }

    #[test]
    fn test_load_semicolon_delimited_events() {
        let src = source("acled", b';', false);
        let loaded =
            load_from_reader(&src, ACLED_SAMPLE.as_bytes(), &KeywordClassifier::default())
                .unwrap();

        assert_eq!(loaded.records.len(), 4);
        assert!(loaded
            .records
            .iter()
            .all(|r| r.date.bucket() == Some(TimeBucket::Invasion)));
        assert_eq!(loaded.records[0].location, "Kherson");
        assert!(loaded
            .records
            .iter()
            .all(|r| r.category == Some(Category::Other)));
    }

    #[test]
    fn test_short_rows_are_kept() {
        let data = "date,category,location\n2015,archaeological,Kerch\n2023\n";
        let loaded = load_from_reader(
            &source("ragged", b',', false),
            data.as_bytes(),
            &KeywordClassifier::default(),
        )
        .unwrap();

        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[1].date, RecordDate::Year(2023));
        assert_eq!(loaded.records[1].category, None);
        assert!(loaded.records[1].location.is_empty());
    }

    #[test]
    fn test_headers_match_case_insensitively_with_bom() {
        let data = "\u{feff}Year_Incident, Place_Incident ,CATEGORY\n2014,Sevastopol,military\n";
        let loaded = load_from_reader(
            &source("mixed-case", b',', false),
            data.as_bytes(),
            &KeywordClassifier::default(),
        )
        .unwrap();

        let record = &loaded.records[0];
        assert_eq!(record.date, RecordDate::Year(2014));
        assert_eq!(record.location, "Sevastopol");
        assert_eq!(record.category, Some(Category::MilitaryHistory));
    }

    #[test]
    fn test_no_usable_columns() {
        let data = "foo,bar\n1,2\n";
        let err = load_from_reader(
            &source("junk", b',', false),
            data.as_bytes(),
            &KeywordClassifier::default(),
        )
        .unwrap_err();

        assert!(matches!(err, LoadError::NoUsableColumns { .. }));
        assert!(err.to_string().contains("foo, bar"));
    }

    #[test]
    fn test_empty_file_yields_no_records() {
        let data = "date,category,location\n";
        let loaded = load_from_reader(
            &source("empty", b',', false),
            data.as_bytes(),
            &KeywordClassifier::default(),
        )
        .unwrap();

        assert!(loaded.records.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let mut data = b"date,location\n2022,Kher".to_vec();
        data.push(0xFF);
        data.extend_from_slice(b"son\n");

        let loaded = load_from_reader(
            &source("bytes", b',', false),
            data.as_slice(),
            &KeywordClassifier::default(),
        )
        .unwrap();

        assert_eq!(loaded.records.len(), 1);
        assert!(loaded.records[0].location.starts_with("Kher"));
    }

    #[test]
    fn test_load_and_inspect_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STOLEN_SAMPLE.as_bytes()).unwrap();

        let mut src = source("stolen-objects", b',', false);
        src.path = file.path().to_path_buf();

        let report = inspect_columns(&src).unwrap();
        let mapped = report.mapped();
        assert_eq!(mapped[0], ("date", Some("year_incident")));
        assert_eq!(mapped[2], ("location", Some("place_incident")));

        let loaded = load_dataset(&src, &KeywordClassifier::default()).unwrap();
        assert_eq!(loaded.records.len(), 8);
    }

    #[test]
    fn test_placeholder_cells_are_unclassified() {
        let data = "date,category,location\n2022,NaN,nan\n2015,null,Kerch\n2023,art,N/A\n";
        let loaded = load_from_reader(
            &source("placeholders", b',', false),
            data.as_bytes(),
            &KeywordClassifier::default(),
        )
        .unwrap();

        assert_eq!(loaded.records[0].category, None);
        assert!(loaded.records[0].location.is_empty());
        assert_eq!(loaded.records[1].category, None);
        assert_eq!(loaded.records[1].location, "Kerch");
        assert_eq!(loaded.records[2].category, Some(Category::NationalArt));
        assert!(loaded.records[2].location.is_empty());
        assert_eq!(loaded.stats.missing_categories, 2);
        assert_eq!(loaded.stats.missing_locations, 2);
    }

    #[test]
    fn test_missing_file() {
        let src = source("does-not-exist-anywhere", b',', false);
        let err = load_dataset(&src, &KeywordClassifier::default()).unwrap_err();

        assert!(matches!(err, LoadError::Io { .. }));
    }
}
