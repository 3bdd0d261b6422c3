//! Timing records and their aggregation.
//!
//! The client appends one NDJSON record per invocation when a timing log is
//! configured; `buildah-agg` turns a log back into per-subcommand
//! statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One buildah invocation: which subcommand ran and for how long (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingRecord {
    pub subcommand: String,
    pub duration: f64,
}

/// Aggregated statistics for one subcommand.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSummary {
    pub subcommand: String,
    pub total: f64,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub stdev: f64,
}

/// Parse newline-delimited JSON timing records; blank lines are skipped.
pub fn parse_records(input: &str) -> Result<Vec<TimingRecord>> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}

/// Group records by subcommand and summarize every group with at least two
/// samples. Output is sorted by subcommand name.
pub fn summarize(records: &[TimingRecord]) -> Vec<TimingSummary> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.subcommand.as_str())
            .or_default()
            .push(record.duration);
    }

    let mut summaries = Vec::new();
    for (subcommand, mut durations) in groups {
        if durations.len() < 2 {
            continue;
        }
        durations.sort_by(f64::total_cmp);
        let count = durations.len();
        let total: f64 = durations.iter().sum();
        let mean = total / count as f64;
        let median = if count % 2 == 1 {
            durations[count / 2]
        } else {
            (durations[count / 2 - 1] + durations[count / 2]) / 2.0
        };
        // Sample standard deviation (n - 1 denominator).
        let variance = durations
            .iter()
            .map(|d| (d - mean).powi(2))
            .sum::<f64>()
            / (count - 1) as f64;
        summaries.push(TimingSummary {
            subcommand: subcommand.to_string(),
            total,
            count,
            mean,
            median,
            stdev: variance.sqrt(),
        });
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subcommand: &str, duration: f64) -> TimingRecord {
        TimingRecord {
            subcommand: subcommand.to_string(),
            duration,
        }
    }

    #[test]
    fn parse_skips_blank_lines() {
        let input = "{\"subcommand\": \"run\", \"duration\": 0.5}\n\n{\"subcommand\": \"rm\", \"duration\": 0.1}\n";
        let records = parse_records(input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subcommand, "run");
        assert_eq!(records[1].duration, 0.1);
    }

    #[test]
    fn parse_rejects_malformed_records() {
        assert!(parse_records("not json\n").is_err());
    }

    #[test]
    fn groups_with_one_sample_are_dropped() {
        let records = vec![record("run", 1.0), record("rm", 1.0), record("rm", 3.0)];
        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].subcommand, "rm");
    }

    #[test]
    fn summary_statistics_match_known_values() {
        let records = vec![
            record("run", 1.0),
            record("run", 2.0),
            record("run", 3.0),
            record("run", 4.0),
        ];
        let summary = &summarize(&records)[0];
        assert_eq!(summary.total, 10.0);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        // Sample stdev of 1..4 is sqrt(5/3).
        assert!((summary.stdev - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn odd_sample_count_takes_the_middle_value() {
        let records = vec![record("run", 3.0), record("run", 1.0), record("run", 2.0)];
        assert_eq!(summarize(&records)[0].median, 2.0);
    }

    #[test]
    fn output_is_sorted_by_subcommand() {
        let records = vec![
            record("rm", 1.0),
            record("rm", 2.0),
            record("add", 1.0),
            record("add", 2.0),
        ];
        let names: Vec<_> = summarize(&records)
            .into_iter()
            .map(|s| s.subcommand)
            .collect();
        assert_eq!(names, vec!["add", "rm"]);
    }
}
