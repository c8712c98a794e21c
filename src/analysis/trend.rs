//! Time-trend aggregation over issue records.
//!
//! Records are grouped by the calendar date of a chosen time field; per day
//! the aggregator reports totals, completion, coarse priority buckets, and
//! per-status counts. Records whose time field is empty or unparseable are
//! dropped (and counted as dropped).

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::ProjectPaths;
use crate::error::Result;
use crate::model::{IssueDataset, IssueKind};

/// Chart dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// One series: records per day.
    Count,
    /// Three series: high/medium/low priority per day.
    Priority,
    /// One series per status label (top-N).
    Status,
}

impl ChartKind {
    /// Stable lowercase label used in chart file names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Priority => "priority",
            Self::Status => "status",
        }
    }
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "priority" => Ok(Self::Priority),
            "status" => Ok(Self::Status),
            other => Err(format!("unknown chart kind: {other}")),
        }
    }
}

/// Aggregation options.
#[derive(Debug, Clone)]
pub struct TrendOptions {
    /// Record kind to aggregate.
    pub kind: IssueKind,
    /// Chart dimension.
    pub chart: ChartKind,
    /// Time field to group by: created, modified, begin, or due.
    pub time_field: String,
    /// Inclusive range start.
    pub since: Option<NaiveDate>,
    /// Inclusive range end.
    pub until: Option<NaiveDate>,
}

impl Default for TrendOptions {
    fn default() -> Self {
        Self {
            kind: IssueKind::Story,
            chart: ChartKind::Count,
            time_field: "created".to_string(),
            since: None,
            until: None,
        }
    }
}

/// Per-day aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyStat {
    /// Calendar date (`YYYY-MM-DD`).
    pub date: String,
    /// Records on this date.
    pub total: usize,
    /// Records whose status reads as done.
    pub completed: usize,
    /// Records created on this date.
    pub new_count: usize,
    /// High-priority records.
    pub high: usize,
    /// Medium-priority records.
    pub medium: usize,
    /// Low-priority records.
    pub low: usize,
    /// Per-status counts.
    pub by_status: BTreeMap<String, usize>,
}

/// Aggregation result plus chart artifact location.
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    /// Kind that was aggregated.
    pub kind: IssueKind,
    /// Chart dimension.
    pub chart: ChartKind,
    /// Time field grouped by.
    pub time_field: String,
    /// Date -> aggregate, ordered by date.
    pub days: BTreeMap<String, DailyStat>,
    /// Records that entered the aggregation.
    pub kept_records: usize,
    /// Records dropped for an empty or unparseable time field.
    pub dropped_records: usize,
    /// Path of the rendered chart, when one was produced.
    pub chart_path: Option<String>,
    /// `file://` URL of the rendered chart.
    pub chart_url: Option<String>,
}

/// Status substrings that read as "done", either script.
const DONE_TOKENS: [&str; 10] = [
    "已完成", "已解决", "已关闭", "完成", "解决", "关闭", "resolved", "closed", "done",
    "finished",
];

/// Priority lexicons for the coarse high/medium/low buckets.
const HIGH_TOKENS: [&str; 7] = ["紧急", "严重", "高", "urgent", "high", "critical", "fatal"];
const MEDIUM_TOKENS: [&str; 6] = ["中", "普通", "一般", "medium", "middle", "normal"];
const LOW_TOKENS: [&str; 6] = ["低", "轻微", "提示", "low", "minor", "insignificant"];

/// Aggregates one kind of record by day.
///
/// Exactly the records with an empty or unparseable time field are dropped;
/// the per-day totals sum to `kept_records`.
pub fn aggregate_trend(dataset: &IssueDataset, options: &TrendOptions) -> Result<TrendReport> {
    let records = dataset.records_of(options.kind);
    let mut days: BTreeMap<String, DailyStat> = BTreeMap::new();
    let mut kept = 0usize;
    let mut dropped = 0usize;

    for record in &records {
        let raw = record.time_field(&options.time_field).unwrap_or("");
        let Some(date) = parse_date(raw) else {
            dropped += 1;
            continue;
        };
        if let Some(since) = options.since
            && date < since
        {
            dropped += 1;
            continue;
        }
        if let Some(until) = options.until
            && date > until
        {
            dropped += 1;
            continue;
        }

        kept += 1;
        let key = date.format("%Y-%m-%d").to_string();
        let stat = days.entry(key.clone()).or_insert_with(|| DailyStat {
            date: key,
            ..Default::default()
        });

        stat.total += 1;
        let status = record.status();
        if is_done(status) {
            stat.completed += 1;
        }
        if parse_date(record.created()) == Some(date) {
            stat.new_count += 1;
        }
        match priority_bucket(record.priority()) {
            Some(PriorityBucket::High) => stat.high += 1,
            Some(PriorityBucket::Medium) => stat.medium += 1,
            Some(PriorityBucket::Low) => stat.low += 1,
            None => {}
        }
        if !status.is_empty() {
            *stat.by_status.entry(status.to_string()).or_insert(0) += 1;
        }
    }

    tracing::debug!(
        kind = %options.kind,
        kept,
        dropped,
        days = days.len(),
        "aggregated time trend"
    );

    Ok(TrendReport {
        kind: options.kind,
        chart: options.chart,
        time_field: options.time_field.clone(),
        days,
        kept_records: kept,
        dropped_records: dropped,
        chart_path: None,
        chart_url: None,
    })
}

/// Aggregates and renders the chart under `local_data/time_trend/`.
pub fn trend_with_chart(
    dataset: &IssueDataset,
    options: &TrendOptions,
    paths: &ProjectPaths,
) -> Result<TrendReport> {
    let mut report = aggregate_trend(dataset, options)?;
    if report.days.is_empty() {
        return Ok(report);
    }

    paths.ensure_dirs()?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let file = format!(
        "{}_{}_{}.png",
        options.kind.label(),
        options.chart.label(),
        timestamp
    );
    let path = paths.time_trend_dir().join(file);

    super::chart::render_chart(&report, &path)?;

    report.chart_url = Some(format!("file://{}", path.display()));
    report.chart_path = Some(path.display().to_string());
    Ok(report)
}

/// Coarse priority bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PriorityBucket {
    High,
    Medium,
    Low,
}

/// Maps an opaque priority label onto a coarse bucket by substring match.
fn priority_bucket(priority: &str) -> Option<PriorityBucket> {
    if priority.is_empty() {
        return None;
    }
    let lower = priority.to_lowercase();
    if HIGH_TOKENS.iter().any(|t| lower.contains(t)) {
        return Some(PriorityBucket::High);
    }
    if MEDIUM_TOKENS.iter().any(|t| lower.contains(t)) {
        return Some(PriorityBucket::Medium);
    }
    if LOW_TOKENS.iter().any(|t| lower.contains(t)) {
        return Some(PriorityBucket::Low);
    }
    None
}

/// Returns true when the status label reads as completed.
fn is_done(status: &str) -> bool {
    if status.is_empty() {
        return false;
    }
    let lower = status.to_lowercase();
    DONE_TOKENS.iter().any(|t| lower.contains(t))
}

/// Parses `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` into a date.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bug, Story};

    fn story(id: &str, created: &str, status: &str, priority: &str) -> Story {
        Story {
            id: id.to_string(),
            name: format!("story {id}"),
            created: created.to_string(),
            status: status.to_string(),
            priority: priority.to_string(),
            ..Default::default()
        }
    }

    fn dataset() -> IssueDataset {
        IssueDataset {
            stories: vec![
                story("1", "2025-01-01 09:00:00", "已完成", "High"),
                story("2", "2025-01-01 15:30:00", "planning", "Low"),
                story("3", "2025-01-02 08:00:00", "planning", "Middle"),
                story("4", "", "planning", "High"),
                story("5", "not a date", "planning", "High"),
            ],
            bugs: vec![Bug {
                id: "9".to_string(),
                title: "bug".to_string(),
                created: "2025-01-01 10:00:00".to_string(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2025-01-01").is_some());
        assert!(parse_date("2025-01-01 09:30:00").is_some());
        assert!(parse_date("").is_none());
        assert!(parse_date("01/02/2025").is_none());
    }

    #[test]
    fn test_aggregate_counts_and_drops() {
        let report = aggregate_trend(&dataset(), &TrendOptions::default()).unwrap();
        // Stories only; two parse failures dropped.
        assert_eq!(report.kept_records, 3);
        assert_eq!(report.dropped_records, 2);

        let day1 = report.days.get("2025-01-01").unwrap();
        assert_eq!(day1.total, 2);
        assert_eq!(day1.completed, 1);
        assert_eq!(day1.new_count, 2);
        assert_eq!(day1.high, 1);
        assert_eq!(day1.low, 1);

        let day2 = report.days.get("2025-01-02").unwrap();
        assert_eq!(day2.total, 1);
        assert_eq!(day2.medium, 1);

        // Per-day totals sum to the kept record count.
        let sum: usize = report.days.values().map(|d| d.total).sum();
        assert_eq!(sum, report.kept_records);
    }

    #[test]
    fn test_aggregate_respects_range() {
        let options = TrendOptions {
            since: NaiveDate::from_ymd_opt(2025, 1, 2),
            until: NaiveDate::from_ymd_opt(2025, 1, 2),
            ..Default::default()
        };
        let report = aggregate_trend(&dataset(), &options).unwrap();
        assert_eq!(report.kept_records, 1);
        assert!(report.days.contains_key("2025-01-02"));
        assert!(!report.days.contains_key("2025-01-01"));
    }

    #[test]
    fn test_aggregate_bug_kind() {
        let options = TrendOptions {
            kind: IssueKind::Bug,
            ..Default::default()
        };
        let report = aggregate_trend(&dataset(), &options).unwrap();
        assert_eq!(report.kept_records, 1);
        assert_eq!(report.days.len(), 1);
    }

    #[test]
    fn test_aggregate_by_status() {
        let report = aggregate_trend(&dataset(), &TrendOptions::default()).unwrap();
        let day1 = report.days.get("2025-01-01").unwrap();
        assert_eq!(day1.by_status.get("已完成"), Some(&1));
        assert_eq!(day1.by_status.get("planning"), Some(&1));
    }

    #[test_case::test_case("urgent", Some(PriorityBucket::High); "urgent is high")]
    #[test_case::test_case("严重", Some(PriorityBucket::High); "yanzhong is high")]
    #[test_case::test_case("High", Some(PriorityBucket::High); "tracker high label")]
    #[test_case::test_case("Middle", Some(PriorityBucket::Medium); "middle is medium")]
    #[test_case::test_case("轻微", Some(PriorityBucket::Low); "qingwei is low")]
    #[test_case::test_case("insignificant", Some(PriorityBucket::Low); "insignificant is low")]
    #[test_case::test_case("", None; "empty is unbucketed")]
    #[test_case::test_case("???", None; "unknown label is unbucketed")]
    fn test_priority_buckets(label: &str, expected: Option<PriorityBucket>) {
        assert_eq!(priority_bucket(label), expected);
    }

    #[test]
    fn test_is_done_both_scripts() {
        assert!(is_done("已解决"));
        assert!(is_done("Resolved"));
        assert!(is_done("closed"));
        assert!(!is_done("planning"));
        assert!(!is_done(""));
    }

    #[test]
    fn test_empty_dataset_empty_report() {
        let report =
            aggregate_trend(&IssueDataset::default(), &TrendOptions::default()).unwrap();
        assert_eq!(report.kept_records, 0);
        assert_eq!(report.dropped_records, 0);
        assert!(report.days.is_empty());
        assert!(report.chart_path.is_none());
    }

    #[test]
    fn test_trend_with_chart_writes_png() {
        use tempfile::TempDir;

        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::at(temp.path());
        let report = trend_with_chart(&dataset(), &TrendOptions::default(), &paths).unwrap();

        let path = report.chart_path.clone().unwrap();
        assert!(path.contains("story_count_"));
        assert!(std::path::Path::new(&path).exists());
        assert!(report.chart_url.unwrap().starts_with("file://"));
    }

    #[test]
    fn test_trend_with_chart_empty_skips_render() {
        use tempfile::TempDir;

        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::at(temp.path());
        let report =
            trend_with_chart(&IssueDataset::default(), &TrendOptions::default(), &paths).unwrap();
        assert!(report.chart_path.is_none());
    }
}
