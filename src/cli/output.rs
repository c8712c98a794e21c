//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats. JSON results carry a top-level
//! `status` field (`success` / `error`); errors add `message` and, when one
//! applies, `suggestion`.

use std::fmt::Write;

use serde::Serialize;
use serde_json::{Value, json};

use crate::analysis::{KeywordReport, OverviewResult, TrendReport};
use crate::error::Error;
use crate::index::{IndexStats, SearchHit};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Wraps a payload as a success envelope and serializes it.
pub fn format_json<T: Serialize>(payload: &T) -> String {
    let mut value = serde_json::to_value(payload).unwrap_or(Value::Null);
    if let Some(map) = value.as_object_mut() {
        map.insert("status".to_string(), json!("success"));
    }
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats an error for the selected output format.
#[must_use]
pub fn format_error(err: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let mut body = json!({
                "status": "error",
                "message": err.to_string(),
            });
            if let Some(suggestion) = err.suggestion()
                && let Some(map) = body.as_object_mut()
            {
                map.insert("suggestion".to_string(), json!(suggestion));
            }
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => err.suggestion().map_or_else(
            || err.to_string(),
            |suggestion| format!("{err}\n  hint: {suggestion}"),
        ),
    }
}

/// Formats index statistics.
#[must_use]
pub fn format_stats(stats: &IndexStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(stats),
        OutputFormat::Text => {
            let mut output = String::new();
            output.push_str("Vector index\n");
            output.push_str("============\n");
            let _ = writeln!(output, "  Chunks:        {}", stats.chunk_count);
            let _ = writeln!(output, "    stories:     {}", stats.story_chunks);
            let _ = writeln!(output, "    bugs:        {}", stats.bug_chunks);
            let _ = writeln!(output, "  Records:       {}", stats.total_records);
            let _ = writeln!(output, "  Dimensions:    {}", stats.vector_dim);
            output
        }
    }
}

/// Formats search hits.
#[must_use]
pub fn format_hits(hits: &[SearchHit], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(&json!({ "results": hits })),
        OutputFormat::Text => {
            if hits.is_empty() {
                return "No matches.\n".to_string();
            }
            let mut output = String::new();
            for (rank, hit) in hits.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "{}. [{:.4}] {} ({} records: {})",
                    rank + 1,
                    hit.score,
                    hit.meta.chunk_id,
                    hit.meta.item_count,
                    hit.meta.item_ids.join(", ")
                );
            }
            output
        }
    }
}

/// Formats the keyword report.
#[must_use]
pub fn format_keywords(report: &KeywordReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(report),
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "Tokens: {} total, {} unique", report.total_tokens, report.unique_tokens);
            output.push_str("Top terms:\n");
            for tc in &report.top_20_tokens {
                let _ = writeln!(output, "  {:<12} {}", tc.token, tc.count);
            }
            output
        }
    }
}

/// Formats the trend report.
#[must_use]
pub fn format_trend(report: &TrendReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(report),
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(
                output,
                "{} by day ({}), {} kept / {} dropped",
                report.kind, report.time_field, report.kept_records, report.dropped_records
            );
            for (date, stat) in &report.days {
                let _ = writeln!(
                    output,
                    "  {date}  total {:<4} done {:<4} high {:<3} med {:<3} low {:<3}",
                    stat.total, stat.completed, stat.high, stat.medium, stat.low
                );
            }
            if let Some(path) = &report.chart_path {
                let _ = writeln!(output, "chart: {path}");
            }
            output
        }
    }
}

/// Formats the overview result.
#[must_use]
pub fn format_overview(result: &OverviewResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(result),
        OutputFormat::Text => format!(
            "{}\n\n({} stories, {} bugs, {} groups)\n",
            result.digest, result.stories_considered, result.bugs_considered, result.groups
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IndexError, StoreError};

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("anything"), OutputFormat::Text);
    }

    #[test]
    fn test_format_error_json_envelope() {
        let err = Error::Store(StoreError::InputMissing {
            path: "issues.json".to_string(),
        });
        let body = format_error(&err, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["status"], "error");
        assert!(value["message"].as_str().unwrap().contains("issues.json"));
        assert!(value["suggestion"].as_str().unwrap().contains("ingestion"));
    }

    #[test]
    fn test_format_error_text_hint() {
        let err = Error::Index(IndexError::NotBuilt {
            base: "b".to_string(),
        });
        let text = format_error(&err, OutputFormat::Text);
        assert!(text.contains("hint:"));
    }

    #[test]
    fn test_format_stats_json_has_status() {
        let stats = IndexStats {
            chunk_count: 2,
            vector_dim: 384,
            total_records: 12,
            story_chunks: 1,
            bug_chunks: 1,
        };
        let body = format_stats(&stats, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["chunk_count"], 2);
    }

    #[test]
    fn test_format_hits_text_empty() {
        assert_eq!(format_hits(&[], OutputFormat::Text), "No matches.\n");
    }
}
