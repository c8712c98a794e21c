//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. LLM-backed commands run
//! inside a tokio runtime with a ctrl-c cancellation token; everything else
//! stays synchronous.

use chrono::NaiveDate;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::analysis::keywords::FieldScope;
use crate::analysis::overview::{OverviewOptions, generate_overview};
use crate::analysis::trend::{TrendOptions, trend_with_chart};
use crate::analysis::analyze_keywords;
use crate::api::{ApiClient, CallOptions};
use crate::cli::output::{
    OutputFormat, format_hits, format_json, format_keywords, format_overview, format_stats,
    format_trend,
};
use crate::cli::parser::{Cli, Commands};
use crate::config::ProjectPaths;
use crate::embedding::create_embedder;
use crate::error::{CommandError, Result};
use crate::eval::{Evaluator, EvaluatorOptions, load_cases, load_knowledge, load_rubric};
use crate::index::VectorIndex;
use crate::store::load_dataset;
use crate::token::TokenCounter;

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let paths = match &cli.root {
        Some(root) => ProjectPaths::at(root.clone()),
        None => ProjectPaths::discover()?,
    };

    match &cli.command {
        Commands::BuildIndex { name, chunk_size } => {
            cmd_build_index(&paths, &cli.dataset, name, *chunk_size, format)
        }
        Commands::Search { query, name, top_k } => {
            cmd_search(&paths, query, name, *top_k, format)
        }
        Commands::Stats { name } => cmd_stats(&paths, name, format),
        Commands::Keywords {
            extended,
            min_frequency,
        } => cmd_keywords(&paths, &cli.dataset, *extended, *min_frequency, format),
        Commands::Trend {
            kind,
            chart,
            time_field,
            since,
            until,
        } => cmd_trend(
            &paths,
            &cli.dataset,
            kind,
            chart,
            time_field,
            since.as_deref(),
            until.as_deref(),
            format,
        ),
        Commands::Overview {
            since,
            until,
            budget,
            model,
            endpoint,
        } => cmd_overview(
            &paths,
            &cli.dataset,
            since.as_deref(),
            until.as_deref(),
            *budget,
            model.clone(),
            endpoint.clone(),
            format,
        ),
        Commands::Evaluate {
            sheet,
            window,
            model,
            endpoint,
        } => cmd_evaluate(
            &paths,
            sheet,
            *window,
            model.clone(),
            endpoint.clone(),
            format,
        ),
    }
}

fn cmd_build_index(
    paths: &ProjectPaths,
    dataset_path: &Path,
    name: &str,
    chunk_size: usize,
    format: OutputFormat,
) -> Result<String> {
    if chunk_size == 0 {
        return Err(CommandError::InvalidArgument("--chunk-size must be at least 1".to_string()).into());
    }

    let dataset = load_dataset(paths, dataset_path)?;
    paths.ensure_dirs()?;
    let embedder = create_embedder(paths)?;
    let index = VectorIndex::build(
        &dataset,
        chunk_size,
        embedder.as_ref(),
        &paths.vector_base(name),
    )?;

    Ok(format_stats(&index.stats(), format))
}

fn cmd_search(
    paths: &ProjectPaths,
    query: &str,
    name: &str,
    top_k: usize,
    format: OutputFormat,
) -> Result<String> {
    let embedder = create_embedder(paths)?;
    let index = VectorIndex::load(&paths.vector_base(name), embedder.as_ref())?;
    let hits = index.search(embedder.as_ref(), query, top_k)?;
    Ok(format_hits(&hits, format))
}

fn cmd_stats(paths: &ProjectPaths, name: &str, format: OutputFormat) -> Result<String> {
    let embedder = create_embedder(paths)?;
    let index = VectorIndex::load(&paths.vector_base(name), embedder.as_ref())?;
    Ok(format_stats(&index.stats(), format))
}

fn cmd_keywords(
    paths: &ProjectPaths,
    dataset_path: &Path,
    extended: bool,
    min_frequency: usize,
    format: OutputFormat,
) -> Result<String> {
    let dataset = load_dataset(paths, dataset_path)?;
    let scope = if extended {
        FieldScope::Extended
    } else {
        FieldScope::Core
    };
    let report = analyze_keywords(&dataset, scope, min_frequency);
    Ok(format_keywords(&report, format))
}

#[allow(clippy::too_many_arguments)]
fn cmd_trend(
    paths: &ProjectPaths,
    dataset_path: &Path,
    kind: &str,
    chart: &str,
    time_field: &str,
    since: Option<&str>,
    until: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let options = TrendOptions {
        kind: kind
            .parse()
            .map_err(CommandError::InvalidArgument)?,
        chart: chart
            .parse()
            .map_err(CommandError::InvalidArgument)?,
        time_field: time_field.to_string(),
        since: parse_date_arg(since)?,
        until: parse_date_arg(until)?,
    };

    let dataset = load_dataset(paths, dataset_path)?;
    let report = trend_with_chart(&dataset, &options, paths)?;
    Ok(format_trend(&report, format))
}

#[allow(clippy::too_many_arguments)]
fn cmd_overview(
    paths: &ProjectPaths,
    dataset_path: &Path,
    since: Option<&str>,
    until: Option<&str>,
    budget: usize,
    model: Option<String>,
    endpoint: Option<String>,
    format: OutputFormat,
) -> Result<String> {
    let options = OverviewOptions {
        since: parse_date_arg(since)?,
        until: parse_date_arg(until)?,
        budget,
        call: CallOptions {
            model,
            endpoint,
            max_tokens: None,
        },
    };

    let dataset = load_dataset(paths, dataset_path)?;
    let counter = TokenCounter::new(paths);
    let client = ApiClient::new()?;

    let result = run_cancellable(|cancel| async move {
        generate_overview(&dataset, &options, &client, &counter, &cancel).await
    })?;
    Ok(format_overview(&result, format))
}

fn cmd_evaluate(
    paths: &ProjectPaths,
    sheet: &Path,
    window: usize,
    model: Option<String>,
    endpoint: Option<String>,
    format: OutputFormat,
) -> Result<String> {
    let rubric = load_rubric(paths)?;
    let knowledge = load_knowledge(paths)?;
    let cases = load_cases(&paths.data_path(sheet))?;

    let counter = TokenCounter::new(paths);
    let client = ApiClient::new()?;
    let options = EvaluatorOptions {
        window,
        call: CallOptions {
            model,
            endpoint,
            max_tokens: None,
        },
        ..Default::default()
    };
    let evaluator = Evaluator::new(&client, &counter, rubric, knowledge, options);

    let report = run_cancellable(|cancel| async move {
        evaluator.evaluate_and_save(&cases, paths, &cancel).await
    })?;

    match format {
        OutputFormat::Json => Ok(format_json(&report)),
        OutputFormat::Text => {
            let scored = report
                .evaluations
                .iter()
                .filter(|e| !e.evaluations.is_empty())
                .count();
            Ok(format!(
                "Evaluated {} cases ({} scored, {} batches), compliant: {}\nreport: {}\n",
                report.total_cases,
                scored,
                report.batches.len(),
                report.priority_analysis.is_compliant,
                report.output_path.as_deref().unwrap_or("-"),
            ))
        }
    }
}

/// Runs an async operation on a fresh runtime with ctrl-c cancellation.
fn run_cancellable<T, Fut>(make: impl FnOnce(CancellationToken) -> Fut) -> Result<T>
where
    Fut: std::future::Future<Output = Result<T>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CommandError::ExecutionFailed(format!("tokio runtime: {e}")))?;

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                watcher.cancel();
            }
        });
        make(cancel).await
    })
}

fn parse_date_arg(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            CommandError::InvalidArgument(format!("expected YYYY-MM-DD, got {s}")).into()
        })
    })
    .transpose()
}
