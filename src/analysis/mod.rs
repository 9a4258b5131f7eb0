//! Analysis modules.
//!
//! The aggregator holds the individual grouping passes; [`summarize`]
//! runs all of them over one record set.

pub mod aggregator;

pub use aggregator::*;

use crate::models::{AnalysisSummary, DatasetStats, Record, RegionRule, RunMetadata};
use chrono::Utc;
use tracing::debug;

/// Knobs for a summary run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Number of locations to rank.
    pub top_n: usize,
    /// Region roll-up rules, first match wins.
    pub regions: Vec<RegionRule>,
}

/// Run every aggregate view over `records`.
pub fn summarize(
    records: &[Record],
    datasets: Vec<DatasetStats>,
    options: &AnalysisOptions,
) -> AnalysisSummary {
    debug!(
        "Aggregating {} records from {} datasets",
        records.len(),
        datasets.len()
    );

    let time = bucket_by_time(records);
    let escalation_pct = escalation(&time);

    AnalysisSummary {
        metadata: RunMetadata {
            generated_at: Utc::now(),
            inputs: datasets.iter().map(|d| d.path.clone()).collect(),
            top_n: options.top_n,
            duration_seconds: 0.0,
        },
        datasets,
        total_records: records.len(),
        malformed_dates: malformed_dates(records),
        time,
        escalation_pct,
        categories: bucket_by_category(records),
        significance: significance_share(records),
        locations: bucket_by_location(records, options.top_n),
        regions: bucket_by_region(records, &options.regions),
        sources: bucket_by_source(records),
        timeline: yearly_timeline(records),
        crosstab: crosstab_time_category(records),
        significance_by_period: significance_by_period(records),
        region_years: crosstab_region_year(records, &options.regions),
        museum_records: museum_records(records),
    }
}

/// Whether the unknown-date or unclassified-category share is above `max_pct`.
///
/// Both shares are taken over all records. A share equal to the threshold
/// passes.
pub fn exceeds_unclassified(summary: &AnalysisSummary, max_pct: f64) -> bool {
    summary.time.unclassified_pct() > max_pct || summary.categories.unclassified_pct() > max_pct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, RecordDate, Significance, TimeBucket};

    #[test]
    fn test_summarize_totals_line_up() {
        let records = vec![
            Record {
                date: RecordDate::Year(2022),
                category: Some(Category::NationalArt),
                location: "Kherson Regional Art Museum".to_string(),
                significance: Significance::High,
                source_dataset: "stolen".to_string(),
                description: None,
            },
            Record {
                date: RecordDate::Malformed("unknown season".to_string()),
                category: None,
                location: String::new(),
                significance: Significance::Unknown,
                source_dataset: "stolen".to_string(),
                description: None,
            },
        ];
        let options = AnalysisOptions {
            top_n: 5,
            regions: vec![RegionRule::new("Kherson", &["kherson"])],
        };

        let summary = summarize(&records, vec![DatasetStats::new("stolen", "stolen.csv")], &options);

        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.time.total(), 2);
        assert_eq!(summary.time.count(&TimeBucket::Invasion), 1);
        assert_eq!(summary.malformed_dates, 1);
        assert_eq!(summary.categories.unclassified, 1);
        assert_eq!(summary.locations.unclassified, 1);
        assert_eq!(summary.regions.count(&"Kherson".to_string()), 1);
        assert_eq!(summary.museum_records, 1);
        assert_eq!(summary.metadata.inputs, vec!["stolen.csv".to_string()]);
        assert_eq!(summary.escalation_pct, None);
        assert_eq!(summary.significance_by_period[2].high_share(), 100.0);
        assert_eq!(summary.region_years.len(), 1);
        assert_eq!(summary.region_years[0].region, "Kherson");
    }

    #[test]
    fn test_summarize_empty() {
        let options = AnalysisOptions {
            top_n: 5,
            regions: Vec::new(),
        };

        let summary = summarize(&[], Vec::new(), &options);

        assert_eq!(summary.total_records, 0);
        assert_eq!(summary.time.total(), 0);
        assert_eq!(summary.categories.total(), 0);
        assert!(summary.timeline.is_empty());
        assert!(summary.region_years.is_empty());
        assert_eq!(summary.significance_by_period.len(), 3);
    }

    fn gate_summary(unknown_dates: usize, unclassified: usize) -> AnalysisSummary {
        let mut records = Vec::new();
        for i in 0..20 {
            records.push(Record {
                date: if i < unknown_dates {
                    RecordDate::Unknown
                } else {
                    RecordDate::Year(2022)
                },
                category: (i >= unclassified).then_some(Category::NationalArt),
                location: "Kherson".to_string(),
                significance: Significance::High,
                source_dataset: "stolen".to_string(),
                description: None,
            });
        }
        let options = AnalysisOptions {
            top_n: 5,
            regions: Vec::new(),
        };
        summarize(&records, Vec::new(), &options)
    }

    #[test]
    fn test_exceeds_unclassified_threshold() {
        // 1 of 20 records = 5%
        let summary = gate_summary(1, 0);
        assert!(!exceeds_unclassified(&summary, 5.0));
        assert!(exceeds_unclassified(&summary, 4.9));
        assert!(!exceeds_unclassified(&summary, 10.0));

        let summary = gate_summary(0, 2);
        assert!(!exceeds_unclassified(&summary, 10.0));
        assert!(exceeds_unclassified(&summary, 9.99));

        let clean = gate_summary(0, 0);
        assert!(!exceeds_unclassified(&clean, 0.0));
    }
}
