//! PNG chart rendering for time trends.
//!
//! Renders line charts with the bitmap backend only. The font stack (ttf /
//! fontconfig) is deliberately not linked, so charts carry series lines,
//! gridlines and tick marks but no text; the JSON report holds the exact
//! per-date numbers. Tick marks follow the label-thinning rule: up to ~30
//! dates get individual ticks, denser ranges are thinned evenly.

use std::path::Path;

use plotters::prelude::*;

use crate::analysis::trend::{ChartKind, DailyStat, TrendReport};
use crate::error::{AnalysisError, Result};

/// Canvas size in pixels.
const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;

/// Maximum individually-ticked dates before thinning kicks in.
const MAX_TICKS: usize = 30;

/// Statuses plotted for the status chart.
const TOP_STATUSES: usize = 6;

/// Fixed series colors: count (blue); priority high/medium/low
/// (red/amber/green); status palette cycled in order.
const COUNT_COLOR: RGBColor = RGBColor(66, 133, 244);
const HIGH_COLOR: RGBColor = RGBColor(219, 68, 55);
const MEDIUM_COLOR: RGBColor = RGBColor(244, 180, 0);
const LOW_COLOR: RGBColor = RGBColor(15, 157, 88);
const STATUS_PALETTE: [RGBColor; 6] = [
    RGBColor(66, 133, 244),
    RGBColor(219, 68, 55),
    RGBColor(244, 180, 0),
    RGBColor(15, 157, 88),
    RGBColor(171, 71, 188),
    RGBColor(0, 172, 193),
];

/// Renders the report's chart to `path`.
pub fn render_chart(report: &TrendReport, path: &Path) -> Result<()> {
    let days: Vec<&DailyStat> = report.days.values().collect();
    if days.is_empty() {
        return Err(AnalysisError::ChartFailed("no data points".to_string()).into());
    }

    let series = build_series(report, &days);
    let y_max = series
        .iter()
        .flat_map(|(_, points)| points.iter().copied())
        .max()
        .unwrap_or(0)
        .max(1);

    draw(path, days.len(), y_max, &series).map_err(|e| {
        crate::Error::Analysis(AnalysisError::ChartFailed(e.to_string()))
    })?;

    tracing::info!(path = %path.display(), points = days.len(), "chart rendered");
    Ok(())
}

/// Extracts the series for the chart kind as `(color, per-day values)`.
fn build_series(report: &TrendReport, days: &[&DailyStat]) -> Vec<(RGBColor, Vec<usize>)> {
    match report.chart {
        ChartKind::Count => vec![(COUNT_COLOR, days.iter().map(|d| d.total).collect())],
        ChartKind::Priority => vec![
            (HIGH_COLOR, days.iter().map(|d| d.high).collect()),
            (MEDIUM_COLOR, days.iter().map(|d| d.medium).collect()),
            (LOW_COLOR, days.iter().map(|d| d.low).collect()),
        ],
        ChartKind::Status => {
            let mut totals: Vec<(String, usize)> = Vec::new();
            for day in days {
                for (status, count) in &day.by_status {
                    match totals.iter_mut().find(|(s, _)| s == status) {
                        Some((_, total)) => *total += count,
                        None => totals.push((status.clone(), *count)),
                    }
                }
            }
            totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            totals.truncate(TOP_STATUSES);

            totals
                .iter()
                .enumerate()
                .map(|(i, (status, _))| {
                    let points = days
                        .iter()
                        .map(|d| d.by_status.get(status).copied().unwrap_or(0))
                        .collect();
                    (STATUS_PALETTE[i % STATUS_PALETTE.len()], points)
                })
                .collect()
        }
    }
}

/// Picks the x indices that receive tick marks: every date when there are at
/// most `max`, an even stride otherwise.
#[must_use]
pub fn thin_ticks(count: usize, max: usize) -> Vec<usize> {
    if count == 0 || max == 0 {
        return Vec::new();
    }
    if count <= max {
        return (0..count).collect();
    }
    let stride = count.div_ceil(max);
    (0..count).step_by(stride).collect()
}

#[allow(clippy::cast_precision_loss)]
fn draw(
    path: &Path,
    points: usize,
    y_max: usize,
    series: &[(RGBColor, Vec<usize>)],
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = (points.saturating_sub(1)).max(1) as f64;
    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .x_label_area_size(24)
        .y_label_area_size(32)
        .build_cartesian_2d(0f64..x_max, 0f64..(y_max as f64 * 1.1))?;

    let plotting = chart.plotting_area();

    // Horizontal gridlines at quarter steps.
    for step in 1..=4 {
        let y = y_max as f64 * 1.1 * f64::from(step) / 4.0;
        plotting.draw(&PathElement::new(
            vec![(0.0, y), (x_max, y)],
            RGBColor(220, 220, 220),
        ))?;
    }

    // Tick marks on the x axis, thinned past ~30 dates.
    for idx in thin_ticks(points, MAX_TICKS) {
        let x = idx as f64;
        plotting.draw(&PathElement::new(
            vec![(x, 0.0), (x, y_max as f64 * 0.02)],
            RGBColor(120, 120, 120),
        ))?;
    }

    for (color, values) in series {
        chart.draw_series(LineSeries::new(
            values.iter().enumerate().map(|(i, v)| (i as f64, *v as f64)),
            ShapeStyle::from(color).stroke_width(2),
        ))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IssueKind;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_report(chart: ChartKind) -> TrendReport {
        let mut days = BTreeMap::new();
        for (date, total) in [("2025-01-01", 2usize), ("2025-01-02", 1)] {
            let mut by_status = BTreeMap::new();
            by_status.insert("planning".to_string(), total);
            days.insert(
                date.to_string(),
                DailyStat {
                    date: date.to_string(),
                    total,
                    completed: 1,
                    new_count: total,
                    high: 1,
                    medium: total.saturating_sub(1),
                    low: 0,
                    by_status,
                },
            );
        }
        TrendReport {
            kind: IssueKind::Story,
            chart,
            time_field: "created".to_string(),
            days,
            kept_records: 3,
            dropped_records: 0,
            chart_path: None,
            chart_url: None,
        }
    }

    #[test]
    fn test_thin_ticks_sparse_all_labeled() {
        assert_eq!(thin_ticks(5, 30), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_thin_ticks_dense_thinned() {
        let ticks = thin_ticks(90, 30);
        assert!(ticks.len() <= 30);
        assert_eq!(ticks[0], 0);
        // Even stride.
        let stride = ticks[1] - ticks[0];
        for pair in ticks.windows(2) {
            assert_eq!(pair[1] - pair[0], stride);
        }
    }

    #[test]
    fn test_thin_ticks_empty() {
        assert!(thin_ticks(0, 30).is_empty());
        assert!(thin_ticks(10, 0).is_empty());
    }

    #[test]
    fn test_render_count_chart() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("count.png");
        render_chart(&sample_report(ChartKind::Count), &path).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_render_priority_chart() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("priority.png");
        render_chart(&sample_report(ChartKind::Priority), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_render_status_chart() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("status.png");
        render_chart(&sample_report(ChartKind::Status), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_render_empty_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.png");
        let mut report = sample_report(ChartKind::Count);
        report.days.clear();
        assert!(render_chart(&report, &path).is_err());
    }

    #[test]
    fn test_single_point_renders() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("single.png");
        let mut report = sample_report(ChartKind::Count);
        let first = report.days.keys().next().cloned().unwrap();
        report.days.retain(|k, _| *k == first);
        render_chart(&report, &path).unwrap();
        assert!(path.exists());
    }
}
