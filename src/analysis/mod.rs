//! Analytical operations over the issue dataset.
//!
//! Keyword extraction, time-trend aggregation with chart output, and the
//! LLM-driven project overview.

pub mod chart;
pub mod keywords;
pub mod overview;
pub mod trend;

pub use keywords::{FieldScope, KeywordReport, TokenCount, analyze_keywords};
pub use overview::{OverviewOptions, OverviewResult, generate_overview};
pub use trend::{ChartKind, DailyStat, TrendOptions, TrendReport, aggregate_trend};
