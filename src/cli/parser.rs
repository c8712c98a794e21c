//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// issuelens: analytics over issue-tracker stories and bugs.
///
/// Builds a semantic search index over the exported dataset, extracts
/// keywords and time trends, and drives token-budgeted LLM evaluation.
#[derive(Parser, Debug)]
#[command(name = "issuelens")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root directory.
    ///
    /// Defaults to discovering the root upward from the current directory.
    #[arg(long, env = "ISSUELENS_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Path to the issue dataset JSON (absolute or project-relative).
    #[arg(
        short,
        long,
        env = "ISSUELENS_DATASET",
        default_value = "local_data/issues.json",
        global = true
    )]
    pub dataset: PathBuf,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build (or rebuild) the semantic vector index from the dataset.
    BuildIndex {
        /// Index name under local_data/vector_data/.
        #[arg(short, long, default_value = "issues")]
        name: String,

        /// Records per chunk.
        #[arg(short, long, default_value = "10")]
        chunk_size: usize,
    },

    /// Search the vector index for a concept.
    Search {
        /// Query text.
        query: String,

        /// Index name under local_data/vector_data/.
        #[arg(short, long, default_value = "issues")]
        name: String,

        /// Maximum results.
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },

    /// Show index statistics.
    Stats {
        /// Index name under local_data/vector_data/.
        #[arg(short, long, default_value = "issues")]
        name: String,
    },

    /// Extract ranked keywords from the dataset.
    Keywords {
        /// Include status/priority/people fields, not just title and
        /// description.
        #[arg(long)]
        extended: bool,

        /// Minimum count for the high-frequency list.
        #[arg(short, long, default_value = "5")]
        min_frequency: usize,
    },

    /// Aggregate records by day and render a chart.
    Trend {
        /// Record kind (story, bug).
        #[arg(short, long, default_value = "story")]
        kind: String,

        /// Chart dimension (count, priority, status).
        #[arg(short, long, default_value = "count")]
        chart: String,

        /// Time field to group by (created, modified, begin, due).
        #[arg(short, long, default_value = "created")]
        time_field: String,

        /// Inclusive range start (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Inclusive range end (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,
    },

    /// Generate an LLM project overview for a date range.
    Overview {
        /// Inclusive range start (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Inclusive range end (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,

        /// Total token budget.
        #[arg(long, default_value = "12000")]
        budget: usize,

        /// Model override.
        #[arg(long)]
        model: Option<String>,

        /// Endpoint override.
        #[arg(long, env = "DS_EP")]
        endpoint: Option<String>,
    },

    /// Evaluate test cases from a spreadsheet against the rubric.
    Evaluate {
        /// Test-case spreadsheet (xlsx).
        sheet: PathBuf,

        /// LLM context window in tokens.
        #[arg(long, default_value = "12000")]
        window: usize,

        /// Model override.
        #[arg(long)]
        model: Option<String>,

        /// Endpoint override.
        #[arg(long, env = "DS_EP")]
        endpoint: Option<String>,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_index() {
        let cli = Cli::try_parse_from(["issuelens", "build-index", "--chunk-size", "4"]).unwrap();
        match cli.command {
            Commands::BuildIndex { name, chunk_size } => {
                assert_eq!(name, "issues");
                assert_eq!(chunk_size, 4);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_search_defaults() {
        let cli = Cli::try_parse_from(["issuelens", "search", "订单"]).unwrap();
        match cli.command {
            Commands::Search { query, top_k, .. } => {
                assert_eq!(query, "订单");
                assert_eq!(top_k, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.format, "text");
    }

    #[test]
    fn test_parse_trend_range() {
        let cli = Cli::try_parse_from([
            "issuelens",
            "trend",
            "--kind",
            "bug",
            "--chart",
            "priority",
            "--since",
            "2025-01-01",
        ])
        .unwrap();
        match cli.command {
            Commands::Trend {
                kind,
                chart,
                since,
                until,
                ..
            } => {
                assert_eq!(kind, "bug");
                assert_eq!(chart, "priority");
                assert_eq!(since.as_deref(), Some("2025-01-01"));
                assert!(until.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["issuelens"]).is_err());
    }

    #[test]
    fn test_parse_evaluate() {
        let cli =
            Cli::try_parse_from(["issuelens", "evaluate", "cases.xlsx", "--window", "8000"])
                .unwrap();
        match cli.command {
            Commands::Evaluate { sheet, window, .. } => {
                assert_eq!(sheet, PathBuf::from("cases.xlsx"));
                assert_eq!(window, 8000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
