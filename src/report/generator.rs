//! Markdown report generation.
//!
//! This module generates the narrative research report from an
//! [`AnalysisSummary`]: data quality first, then the temporal,
//! categorical and geographic views.

use crate::analysis::OTHER_REGION;
use crate::models::{
    AggregateResult, AnalysisSummary, Category, DatasetStats, RunMetadata, Significance,
};
use anyhow::Result;
use std::fmt::Display;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(summary: &AnalysisSummary) -> String {
    let mut output = String::new();

    output.push_str("# Cultural Heritage Harm: Aggregate Report\n\n");
    output.push_str(&generate_metadata_section(&summary.metadata, summary.total_records));
    output.push_str(&generate_quality_section(summary));
    output.push_str(&generate_time_section(summary));
    output.push_str(&generate_category_section(summary));
    output.push_str(&generate_location_section(summary));
    output.push_str(&generate_timeline_section(summary));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &RunMetadata, total_records: usize) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Datasets:** {}\n", metadata.inputs.len()));
    for input in &metadata.inputs {
        section.push_str(&format!("  - `{}`\n", input));
    }
    section.push_str(&format!("- **Total Records:** {}\n", total_records));
    section.push_str(&format!(
        "- **Processing Time:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Data-quality section: every record that could not be classified.
fn generate_quality_section(summary: &AnalysisSummary) -> String {
    let mut section = String::new();

    section.push_str("## Data Quality\n\n");
    section.push_str("| Measure | Records | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    section.push_str(&quality_row(
        "Unknown or out-of-period date",
        summary.time.unclassified,
        summary.total_records,
    ));
    section.push_str(&quality_row(
        "Unparseable date text",
        summary.malformed_dates,
        summary.total_records,
    ));
    section.push_str(&quality_row(
        "Missing category",
        summary.categories.unclassified,
        summary.total_records,
    ));
    section.push_str(&quality_row(
        "Missing location",
        summary.locations.unclassified,
        summary.total_records,
    ));
    section.push('\n');

    if !summary.datasets.is_empty() {
        section.push_str(&generate_dataset_table(&summary.datasets));
    }

    section
}

fn quality_row(label: &str, count: usize, total: usize) -> String {
    format!(
        "| {} | {} | {:.1}% |\n",
        label,
        count,
        crate::models::percentage(count, total)
    )
}

fn generate_dataset_table(datasets: &[DatasetStats]) -> String {
    let mut table = String::new();

    table.push_str("### Records by Dataset\n\n");
    table.push_str("| Dataset | Records | Malformed Dates | No Category | No Location |\n");
    table.push_str("|:---|:---:|:---:|:---:|:---:|\n");
    for dataset in datasets {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            dataset.name,
            dataset.records,
            dataset.malformed_dates,
            dataset.missing_categories,
            dataset.missing_locations
        ));
    }
    table.push('\n');

    table
}

/// Render an aggregate as a count/percentage table.
fn aggregate_table<K: Display>(
    heading: &str,
    result: &AggregateResult<K>,
    unclassified_label: &str,
) -> String {
    let mut table = String::new();

    table.push_str(&format!("| {} | Count | Share |\n", heading));
    table.push_str("|:---|:---:|:---:|\n");
    for entry in &result.entries {
        table.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            entry.key, entry.count, entry.percentage
        ));
    }
    if result.unclassified > 0 {
        table.push_str(&format!(
            "| *{}* | {} | - |\n",
            unclassified_label, result.unclassified
        ));
    }
    table.push_str(&format!("| **Total** | **{}** | |\n\n", result.total()));

    table
}

/// Temporal escalation section.
fn generate_time_section(summary: &AnalysisSummary) -> String {
    let mut section = String::new();

    section.push_str("## Temporal Escalation\n\n");
    section.push_str(&aggregate_table("Period", &summary.time, "Unknown date"));
    section.push_str("Shares are computed over records with a usable date.\n\n");

    if let Some(pct) = summary.escalation_pct {
        section.push_str(&format!(
            "Records dated 2022-2025 changed by **{:+.1}%** compared with 2014-2021.\n\n",
            pct
        ));
    }

    section
}

/// Categorical targeting section, including significance.
fn generate_category_section(summary: &AnalysisSummary) -> String {
    let mut section = String::new();

    section.push_str("## Categorical Targeting\n\n");
    section.push_str(&aggregate_table("Category", &summary.categories, "Unclassified"));
    section.push_str("Shares are computed over classified records; unclassified records are listed separately.\n\n");

    section.push_str("### Significance to National Identity\n\n");
    section.push_str(&aggregate_table("Significance", &summary.significance, "Unclassified"));

    if summary.significance_by_period.iter().any(|row| row.levels.total() > 0) {
        section.push_str("| Period | High | Low | Unknown | High share |\n");
        section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
        for row in &summary.significance_by_period {
            section.push_str(&format!(
                "| {} | {} | {} | {} | {:.1}% |\n",
                row.bucket,
                row.levels.count(&Significance::High),
                row.levels.count(&Significance::Low),
                row.levels.count(&Significance::Unknown),
                row.high_share()
            ));
        }
        section.push('\n');
    }

    if summary.crosstab.iter().any(|row| row.categories.total() > 0) {
        section.push_str("### Category by Period\n\n");
        section.push_str("| Period |");
        for category in Category::ALL {
            section.push_str(&format!(" {} |", category));
        }
        section.push_str(" Unclassified |\n|:---|");
        section.push_str(&":---:|".repeat(Category::ALL.len() + 1));
        section.push('\n');

        for row in &summary.crosstab {
            section.push_str(&format!("| {} |", row.bucket));
            for category in Category::ALL {
                section.push_str(&format!(" {} |", row.categories.count(&category)));
            }
            section.push_str(&format!(" {} |\n", row.categories.unclassified));
        }
        section.push('\n');
    }

    section
}

/// Geographic concentration section.
fn generate_location_section(summary: &AnalysisSummary) -> String {
    let mut section = String::new();
    let ranking = &summary.locations;

    section.push_str("## Geographic Concentration\n\n");
    section.push_str(&format!(
        "Top {} of {} distinct locations.\n\n",
        ranking.entries.len(),
        ranking.distinct_locations
    ));

    section.push_str("| # | Location | Records | Share |\n");
    section.push_str("|:---:|:---|:---:|:---:|\n");
    for (i, entry) in ranking.entries.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {:.1}% |\n",
            i + 1,
            entry.location,
            entry.count,
            entry.percentage
        ));
    }
    if ranking.remainder > 0 {
        section.push_str(&format!(
            "| | *All other locations* | {} | |\n",
            ranking.remainder
        ));
    }
    if ranking.unclassified > 0 {
        section.push_str(&format!(
            "| | *No location* | {} | |\n",
            ranking.unclassified
        ));
    }
    section.push('\n');

    section.push_str(&format!(
        "Records at museums: **{}**\n\n",
        summary.museum_records
    ));

    let has_regions = summary
        .regions
        .entries
        .iter()
        .any(|e| e.key != OTHER_REGION && e.count > 0);
    if has_regions {
        section.push_str("### Regions\n\n");
        section.push_str(&aggregate_table("Region", &summary.regions, "No location"));
    }

    if let Some(first) = summary.region_years.first() {
        section.push_str("### Region by Year\n\n| Region |");
        for cell in &first.years {
            section.push_str(&format!(" {} |", cell.year));
        }
        section.push_str("\n|:---|");
        section.push_str(&":---:|".repeat(first.years.len()));
        section.push('\n');

        for row in &summary.region_years {
            section.push_str(&format!("| {} |", row.region));
            for cell in &row.years {
                section.push_str(&format!(" {} |", cell.count));
            }
            section.push('\n');
        }
        section.push('\n');
    }

    section
}

/// Yearly timeline section.
fn generate_timeline_section(summary: &AnalysisSummary) -> String {
    if summary.timeline.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Yearly Timeline\n\n");
    section.push_str("| Year | Records |\n");
    section.push_str("|:---:|:---:|\n");
    for point in &summary.timeline {
        section.push_str(&format!("| {} | {} |\n", point.year, point.count));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by heritage-tally v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(summary: &AnalysisSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{summarize, AnalysisOptions};
    use crate::models::{Record, RecordDate, RegionRule};

    fn create_test_summary() -> AnalysisSummary {
        let mut records = Vec::new();
        for (year, category, location) in [
            (Some(2022), Some(Category::NationalArt), "Kherson Regional Art Museum"),
            (Some(2022), Some(Category::NationalArt), "Kherson Regional Art Museum"),
            (Some(2015), Some(Category::ArchaeologicalHeritage), "Kerch"),
            (None, None, ""),
        ] {
            records.push(Record {
                date: year.map_or(RecordDate::Unknown, RecordDate::Year),
                category,
                location: location.to_string(),
                significance: Significance::inferred(category),
                source_dataset: "stolen".to_string(),
                description: None,
            });
        }

        let mut stats = DatasetStats::new("stolen", "raw_data/stolen.csv");
        for record in &records {
            stats.observe(record);
        }

        let options = AnalysisOptions {
            top_n: 5,
            regions: vec![
                RegionRule::new("Crimea", &["kerch"]),
                RegionRule::new("Kherson", &["kherson"]),
            ],
        };
        summarize(&records, vec![stats], &options)
    }

    #[test]
    fn test_generate_markdown_report() {
        let summary = create_test_summary();
        let markdown = generate_markdown_report(&summary);

        assert!(markdown.contains("# Cultural Heritage Harm"));
        assert!(markdown.contains("## Data Quality"));
        assert!(markdown.contains("## Temporal Escalation"));
        assert!(markdown.contains("## Categorical Targeting"));
        assert!(markdown.contains("## Geographic Concentration"));
        assert!(markdown.contains("| 1 | Kherson Regional Art Museum | 2 | 66.7% |"));
        assert!(markdown.contains("| *Unknown date* | 1 | - |"));
        assert!(markdown.contains("+100.0%"));
        assert!(markdown.contains("### Regions"));
        assert!(markdown.contains("`raw_data/stolen.csv`"));
        assert!(markdown.contains("### Region by Year"));
        assert!(markdown.contains("| Region | 2015 | 2022 |"));
        assert!(markdown.contains("| Kherson | 0 | 2 |"));
        assert!(markdown.contains("| 2022-2025 | 2 | 0 | 0 | 100.0% |"));
    }

    #[test]
    fn test_aggregate_table_accepts_display_only_keys() {
        struct Label(&'static str);

        impl Display for Label {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        let result = AggregateResult::from_counts(vec![(Label("kherson"), 3), (Label("kyiv"), 1)], 2);
        let table = aggregate_table("Feed", &result, "Unassigned");

        assert!(table.contains("| kherson | 3 | 75.0% |"));
        assert!(table.contains("| *Unassigned* | 2 | - |"));
        assert!(table.contains("| **Total** | **6** | |"));
    }

    #[test]
    fn test_category_table_lists_unclassified() {
        let summary = create_test_summary();
        let section = generate_category_section(&summary);

        assert!(section.contains("| National art | 2 | 66.7% |"));
        assert!(section.contains("| *Unclassified* | 1 | - |"));
        assert!(section.contains("### Category by Period"));
    }

    #[test]
    fn test_quality_section() {
        let summary = create_test_summary();
        let section = generate_quality_section(&summary);

        assert!(section.contains("| Unknown or out-of-period date | 1 | 25.0% |"));
        assert!(section.contains("| Missing location | 1 | 25.0% |"));
        assert!(section.contains("| stolen | 4 | 0 | 1 | 1 |"));
    }

    #[test]
    fn test_empty_summary_renders() {
        let options = AnalysisOptions {
            top_n: 5,
            regions: Vec::new(),
        };
        let summary = summarize(&[], Vec::new(), &options);
        let markdown = generate_markdown_report(&summary);

        assert!(markdown.contains("| **Total** | **0** | |"));
        assert!(!markdown.contains("## Yearly Timeline"));
        assert!(!markdown.contains("changed by"));
    }

    #[test]
    fn test_generate_json_report() {
        let summary = create_test_summary();
        let json = generate_json_report(&summary).unwrap();

        assert!(json.contains("\"total_records\": 4"));
        assert!(json.contains("\"national-art\""));
        assert!(json.contains("\"2022-2025\""));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["categories"]["unclassified"], 1);
        assert_eq!(value["locations"]["entries"][0]["count"], 2);
    }
}
