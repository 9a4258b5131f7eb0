//! Record aggregation and statistics.
//!
//! Single-pass grouping of records along time, category and location,
//! plus the derived views used by the research report. Every function is
//! total: records that cannot be placed are counted, never dropped.

use crate::models::{
    normalize_location, percentage, AggregateResult, Category, CrosstabRow, LocationCount,
    LocationRanking, Record, RegionRule, RegionYearRow, Significance, SignificanceRow, TimeBucket,
    YearCount, ANALYSIS_END_YEAR,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Label for locations that match no region rule.
pub const OTHER_REGION: &str = "Other";

/// Count records per time bucket.
///
/// Undated, unparseable and out-of-period records land in `unclassified`
/// so that the buckets plus that bin always add up to the input size.
pub fn bucket_by_time(records: &[Record]) -> AggregateResult<TimeBucket> {
    let mut counts = [0usize; 3];
    let mut unknown = 0;

    for record in records {
        match record.date.bucket() {
            Some(bucket) => counts[bucket_index(bucket)] += 1,
            None => unknown += 1,
        }
    }

    AggregateResult::from_counts(
        TimeBucket::ALL.into_iter().zip(counts).collect(),
        unknown,
    )
}

fn bucket_index(bucket: TimeBucket) -> usize {
    match bucket {
        TimeBucket::Pre2014 => 0,
        TimeBucket::Annexation => 1,
        TimeBucket::Invasion => 2,
    }
}

/// Count records per category, in enumeration order.
///
/// Records without any category are reported as unclassified.
pub fn bucket_by_category<'a, I>(records: I) -> AggregateResult<Category>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts: HashMap<Category, usize> = HashMap::new();
    let mut unclassified = 0;

    for record in records {
        match record.category {
            Some(category) => *counts.entry(category).or_default() += 1,
            None => unclassified += 1,
        }
    }

    AggregateResult::from_counts(
        Category::ALL
            .into_iter()
            .map(|c| (c, counts.get(&c).copied().unwrap_or(0)))
            .collect(),
        unclassified,
    )
}

/// Rank locations by record count and keep the top `top_n`.
///
/// Locations are grouped case- and whitespace-insensitively. Ties are
/// broken by the normalized name so the output is stable across runs.
pub fn bucket_by_location(records: &[Record], top_n: usize) -> LocationRanking {
    // key -> (first spelling seen, count)
    let mut grouped: HashMap<String, (String, usize)> = HashMap::new();
    let mut unclassified = 0;

    for record in records {
        let Some(key) = record.location_key() else {
            unclassified += 1;
            continue;
        };
        grouped
            .entry(key)
            .or_insert_with(|| (record.location.trim().to_string(), 0))
            .1 += 1;
    }

    let located: usize = grouped.values().map(|(_, count)| count).sum();
    let distinct_locations = grouped.len();

    let mut ranked: Vec<(String, String, usize)> = grouped
        .into_iter()
        .map(|(key, (label, count))| (key, label, count))
        .collect();
    ranked.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

    let remainder = ranked.iter().skip(top_n).map(|(_, _, count)| count).sum();
    let entries = ranked
        .into_iter()
        .take(top_n)
        .map(|(_, location, count)| LocationCount {
            location,
            count,
            percentage: percentage(count, located),
        })
        .collect();

    LocationRanking {
        entries,
        remainder,
        unclassified,
        distinct_locations,
    }
}

/// Roll locations up into named regions.
///
/// The first matching rule wins; locations matching none go to
/// [`OTHER_REGION`], empty locations are unclassified.
pub fn bucket_by_region(records: &[Record], rules: &[RegionRule]) -> AggregateResult<String> {
    let mut counts = vec![0usize; rules.len()];
    let mut other = 0;
    let mut unclassified = 0;

    for record in records {
        let normalized = normalize_location(&record.location);
        if normalized.is_empty() {
            unclassified += 1;
            continue;
        }
        match region_index(&normalized, rules) {
            idx if idx < rules.len() => counts[idx] += 1,
            _ => other += 1,
        }
    }

    let mut pairs: Vec<(String, usize)> = rules
        .iter()
        .map(|rule| rule.name.clone())
        .zip(counts)
        .collect();
    pairs.push((OTHER_REGION.to_string(), other));

    AggregateResult::from_counts(pairs, unclassified)
}

/// Count records per source dataset, largest feed first.
pub fn bucket_by_source(records: &[Record]) -> AggregateResult<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

    for record in records {
        *counts.entry(record.source_dataset.as_str()).or_default() += 1;
    }

    let mut pairs: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    pairs.sort_by_key(|(_, count)| std::cmp::Reverse(*count));

    AggregateResult::from_counts(pairs, 0)
}

/// Share of records per significance level.
///
/// Unknown significance is a level of its own, not an unclassified bin.
pub fn significance_share<'a, I>(records: I) -> AggregateResult<Significance>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts: HashMap<Significance, usize> = HashMap::new();

    for record in records {
        *counts.entry(record.significance).or_default() += 1;
    }

    AggregateResult::from_counts(
        Significance::ALL
            .into_iter()
            .map(|s| (s, counts.get(&s).copied().unwrap_or(0)))
            .collect(),
        0,
    )
}

/// Per-year record counts within the analyzed period, ascending.
pub fn yearly_timeline(records: &[Record]) -> Vec<YearCount> {
    let mut years: BTreeMap<i32, usize> = BTreeMap::new();

    for record in records {
        if let Some(year) = record.date.year().filter(|y| *y <= ANALYSIS_END_YEAR) {
            *years.entry(year).or_default() += 1;
        }
    }

    years
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect()
}

/// Category breakdown per time bucket.
///
/// Only dated records appear here; within a row, records without a
/// category are that row's unclassified count.
pub fn crosstab_time_category(records: &[Record]) -> Vec<CrosstabRow> {
    TimeBucket::ALL
        .into_iter()
        .map(|bucket| CrosstabRow {
            bucket,
            categories: bucket_by_category(in_bucket(records, bucket)),
        })
        .collect()
}

fn in_bucket(records: &[Record], bucket: TimeBucket) -> impl Iterator<Item = &Record> {
    records
        .iter()
        .filter(move |r| r.date.bucket() == Some(bucket))
}

/// Significance levels per time bucket; undated records are left out.
pub fn significance_by_period(records: &[Record]) -> Vec<SignificanceRow> {
    TimeBucket::ALL
        .into_iter()
        .map(|bucket| SignificanceRow {
            bucket,
            levels: significance_share(in_bucket(records, bucket)),
        })
        .collect()
}

/// Region by year counts for a heatmap.
///
/// Only records with both a location and a year inside the analyzed period
/// take part. Every row spans the same years; regions without any record
/// are omitted, [`OTHER_REGION`] comes last.
pub fn crosstab_region_year(records: &[Record], rules: &[RegionRule]) -> Vec<RegionYearRow> {
    let mut cells: HashMap<(usize, i32), usize> = HashMap::new();
    let mut years: BTreeSet<i32> = BTreeSet::new();

    for record in records {
        let Some(year) = record.date.year().filter(|y| *y <= ANALYSIS_END_YEAR) else {
            continue;
        };
        let normalized = normalize_location(&record.location);
        if normalized.is_empty() {
            continue;
        }

        let region = region_index(&normalized, rules);
        *cells.entry((region, year)).or_default() += 1;
        years.insert(year);
    }

    // index rules.len() is the catch-all region
    (0..=rules.len())
        .map(|idx| RegionYearRow {
            region: rules
                .get(idx)
                .map_or(OTHER_REGION.to_string(), |rule| rule.name.clone()),
            years: years
                .iter()
                .map(|&year| YearCount {
                    year,
                    count: cells.get(&(idx, year)).copied().unwrap_or(0),
                })
                .collect(),
        })
        .filter(|row| row.total() > 0)
        .collect()
}

/// Index of the first matching rule, `rules.len()` when none matches.
fn region_index(normalized_location: &str, rules: &[RegionRule]) -> usize {
    rules
        .iter()
        .position(|rule| rule.matches(normalized_location))
        .unwrap_or(rules.len())
}

/// Percent change of the invasion bucket over the annexation bucket.
pub fn escalation(time: &AggregateResult<TimeBucket>) -> Option<f64> {
    let before = time.count(&TimeBucket::Annexation);
    let after = time.count(&TimeBucket::Invasion);

    if before == 0 {
        return None;
    }

    Some((after as f64 / before as f64 - 1.0) * 100.0)
}

/// Number of records whose location names a museum.
pub fn museum_records(records: &[Record]) -> usize {
    records
        .iter()
        .filter(|r| r.location.to_lowercase().contains("museum"))
        .count()
}

/// Number of records whose date text could not be parsed.
pub fn malformed_dates(records: &[Record]) -> usize {
    records.iter().filter(|r| r.date.is_malformed()).count()
}
