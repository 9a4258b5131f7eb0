//! Chart-ready CSV summary tables.
//!
//! One file per aggregate view, each with a header row, written into a
//! single output directory.

use crate::models::{AggregateResult, AnalysisSummary, Category, Significance};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize)]
struct AggregateRow {
    key: String,
    count: usize,
    percentage: String,
}

#[derive(Debug, Serialize)]
struct LocationRow {
    rank: String,
    location: String,
    count: usize,
    percentage: String,
}

#[derive(Debug, Serialize)]
struct TimelineRow {
    year: i32,
    count: usize,
}

#[derive(Debug, Serialize)]
struct CrosstabCsvRow<'a> {
    period: &'a str,
    category: &'a str,
    count: usize,
    percentage: String,
}

#[derive(Debug, Serialize)]
struct PeriodSignificanceRow<'a> {
    period: &'a str,
    high: usize,
    low: usize,
    unknown: usize,
    high_percentage: String,
}

#[derive(Debug, Serialize)]
struct RegionYearCsvRow<'a> {
    region: &'a str,
    year: i32,
    count: usize,
}

#[derive(Debug, Serialize)]
struct DatasetRow<'a> {
    dataset: &'a str,
    path: &'a str,
    records: usize,
    malformed_dates: usize,
    missing_categories: usize,
    missing_locations: usize,
    unreadable_rows: usize,
}

fn pct(value: f64) -> String {
    format!("{:.1}", value)
}

/// Rows for an aggregate view, unclassified appended under `unclassified_key`.
fn aggregate_rows<K>(
    result: &AggregateResult<K>,
    key: impl Fn(&K) -> String,
    unclassified_key: &str,
) -> Vec<AggregateRow> {
    let mut rows: Vec<AggregateRow> = result
        .entries
        .iter()
        .map(|entry| AggregateRow {
            key: key(&entry.key),
            count: entry.count,
            percentage: pct(entry.percentage),
        })
        .collect();

    rows.push(AggregateRow {
        key: unclassified_key.to_string(),
        count: result.unclassified,
        percentage: String::new(),
    });

    rows
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Write every summary table into `dir`, creating it if needed.
///
/// Returns the paths of the written files.
pub fn write_csv_tables(summary: &AnalysisSummary, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let ranking = &summary.locations;
    let mut location_rows: Vec<LocationRow> = ranking
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| LocationRow {
            rank: (i + 1).to_string(),
            location: entry.location.clone(),
            count: entry.count,
            percentage: pct(entry.percentage),
        })
        .collect();
    location_rows.push(LocationRow {
        rank: String::new(),
        location: "remainder".to_string(),
        count: ranking.remainder,
        percentage: String::new(),
    });
    location_rows.push(LocationRow {
        rank: String::new(),
        location: "unclassified".to_string(),
        count: ranking.unclassified,
        percentage: String::new(),
    });

    let timeline_rows: Vec<TimelineRow> = summary
        .timeline
        .iter()
        .map(|point| TimelineRow {
            year: point.year,
            count: point.count,
        })
        .collect();

    let dataset_rows: Vec<DatasetRow> = summary
        .datasets
        .iter()
        .map(|d| DatasetRow {
            dataset: &d.name,
            path: &d.path,
            records: d.records,
            malformed_dates: d.malformed_dates,
            missing_categories: d.missing_categories,
            missing_locations: d.missing_locations,
            unreadable_rows: d.unreadable_rows,
        })
        .collect();

    // long format: one row per (period, category), unclassified last per period
    let mut crosstab_rows = Vec::new();
    for row in &summary.crosstab {
        for category in Category::ALL {
            crosstab_rows.push(CrosstabCsvRow {
                period: row.bucket.slug(),
                category: category.slug(),
                count: row.categories.count(&category),
                percentage: pct(row.categories.percentage(&category)),
            });
        }
        crosstab_rows.push(CrosstabCsvRow {
            period: row.bucket.slug(),
            category: "unclassified",
            count: row.categories.unclassified,
            percentage: String::new(),
        });
    }

    let period_significance_rows: Vec<PeriodSignificanceRow> = summary
        .significance_by_period
        .iter()
        .map(|row| PeriodSignificanceRow {
            period: row.bucket.slug(),
            high: row.levels.count(&Significance::High),
            low: row.levels.count(&Significance::Low),
            unknown: row.levels.count(&Significance::Unknown),
            high_percentage: pct(row.high_share()),
        })
        .collect();

    let region_year_rows: Vec<RegionYearCsvRow> = summary
        .region_years
        .iter()
        .flat_map(|row| {
            row.years.iter().map(move |cell| RegionYearCsvRow {
                region: &row.region,
                year: cell.year,
                count: cell.count,
            })
        })
        .collect();

    let mut written = Vec::new();
    let mut emit = |name: &str| {
        let path = dir.join(name);
        written.push(path.clone());
        path
    };

    write_rows(
        &emit("time_buckets.csv"),
        &aggregate_rows(&summary.time, |b| b.slug().to_string(), "unknown"),
    )?;
    write_rows(
        &emit("categories.csv"),
        &aggregate_rows(&summary.categories, |c| c.slug().to_string(), "unclassified"),
    )?;
    write_rows(
        &emit("significance.csv"),
        &aggregate_rows(&summary.significance, |s| s.slug().to_string(), "unclassified"),
    )?;
    write_rows(
        &emit("regions.csv"),
        &aggregate_rows(&summary.regions, String::clone, "unclassified"),
    )?;
    write_rows(
        &emit("sources.csv"),
        &aggregate_rows(&summary.sources, String::clone, "unclassified"),
    )?;
    write_rows(&emit("locations.csv"), &location_rows)?;
    write_rows(&emit("timeline.csv"), &timeline_rows)?;
    write_rows(&emit("crosstab.csv"), &crosstab_rows)?;
    write_rows(&emit("significance_by_period.csv"), &period_significance_rows)?;
    write_rows(&emit("region_years.csv"), &region_year_rows)?;
    write_rows(&emit("datasets.csv"), &dataset_rows)?;

    Ok(written)
}
