//! Integration tests for issuelens.
//!
//! These run on the deterministic fallback embedder so no model download or
//! network access is required.

#![allow(clippy::expect_used)]

use issuelens::analysis::keywords::FieldScope;
use issuelens::analysis::trend::{TrendOptions, trend_with_chart};
use issuelens::analysis::analyze_keywords;
use issuelens::config::ProjectPaths;
use issuelens::embedding::FallbackEmbedder;
use issuelens::eval::{analyze_priorities, parse_tables, PriorityRange, RubricConfig, TestCase};
use issuelens::extract::canonical_text;
use issuelens::index::VectorIndex;
use issuelens::model::{Bug, IssueDataset, IssueKind, IssueRecord, Story};
use issuelens::store::{load_dataset, save_json};
use issuelens::token::batching;
use tempfile::TempDir;

/// The reference dataset from the build-and-query scenario: two stories and
/// one bug.
fn reference_dataset() -> IssueDataset {
    IssueDataset {
        stories: vec![
            Story {
                id: "S1".to_string(),
                name: "订单列表分页".to_string(),
                status: "planning".to_string(),
                priority: "High".to_string(),
                created: "2025-01-01 09:00:00".to_string(),
                ..Default::default()
            },
            Story {
                id: "S2".to_string(),
                name: "订单详情页加载慢".to_string(),
                status: "developing".to_string(),
                priority: "Middle".to_string(),
                created: "2025-01-01 10:00:00".to_string(),
                ..Default::default()
            },
        ],
        bugs: vec![Bug {
            id: "B1".to_string(),
            title: "支付回调超时".to_string(),
            status: "new".to_string(),
            priority: "urgent".to_string(),
            created: "2025-01-02 11:00:00".to_string(),
            ..Default::default()
        }],
    }
}

#[test]
fn test_build_and_query() {
    let temp = TempDir::new().expect("temp dir");
    let base = temp.path().join("issues");
    let embedder = FallbackEmbedder::new(64);

    // K=2 over [S1, S2] stories and [B1] bugs: one story chunk, one bug
    // chunk.
    let index =
        VectorIndex::build(&reference_dataset(), 2, &embedder, &base).expect("build failed");
    let stats = index.stats();
    assert_eq!(stats.chunk_count, 2);
    assert_eq!(stats.story_chunks, 1);
    assert_eq!(stats.bug_chunks, 1);
    assert_eq!(stats.total_records, 3);

    let story_chunk = &index.metadata()[0];
    assert_eq!(story_chunk.item_ids, vec!["S1", "S2"]);
    assert_eq!(story_chunk.kind, IssueKind::Story);

    let hits = index.search(&embedder, "订单", 2).expect("search failed");
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score >= hits[1].score);
    for hit in &hits {
        assert!((-1.0..=1.0).contains(&hit.score));
    }
}

#[test]
fn test_index_round_trip_through_disk() {
    let temp = TempDir::new().expect("temp dir");
    let base = temp.path().join("issues");
    let embedder = FallbackEmbedder::new(64);

    let built = VectorIndex::build(&reference_dataset(), 2, &embedder, &base).expect("build");
    let loaded = VectorIndex::load(&base, &embedder).expect("load");
    assert_eq!(built.metadata(), loaded.metadata());

    // The embedded text of every chunk is the concatenation of its records'
    // canonical texts.
    let dataset = reference_dataset();
    let story_texts: Vec<String> = dataset
        .stories
        .iter()
        .map(|s| canonical_text(&IssueRecord::Story(s)))
        .collect();
    assert_eq!(loaded.metadata()[0].text, story_texts.join(" | "));
}

#[test]
fn test_dataset_file_round_trip() {
    let temp = TempDir::new().expect("temp dir");
    let paths = ProjectPaths::at(temp.path());
    let file = temp.path().join("local_data/issues.json");

    save_json(&file, &reference_dataset()).expect("save failed");
    let loaded = load_dataset(&paths, "local_data/issues.json").expect("load failed");
    assert_eq!(loaded, reference_dataset());
}

#[test]
fn test_token_split_scenario() {
    // Estimates [800, 900, 900, 1100] with T=2000 -> [[800,900],[900],[1100]].
    let estimates = [800usize, 900, 900, 1100];
    let batches = batching::split_all(&estimates, |t| *t, 2000);
    let grouped: Vec<Vec<usize>> = batches
        .iter()
        .map(|b| estimates[b.range.clone()].to_vec())
        .collect();
    assert_eq!(grouped, vec![vec![800, 900], vec![900], vec![1100]]);
}

#[test]
fn test_priority_compliance_scenario() {
    // 20 cases: 2 P0, 14 P1, 4 P2; rubric P0:[10,20] P1:[60,70] P2:[10,30].
    let mut ratios = std::collections::BTreeMap::new();
    ratios.insert("P0".to_string(), PriorityRange { min: 10, max: 20 });
    ratios.insert("P1".to_string(), PriorityRange { min: 60, max: 70 });
    ratios.insert("P2".to_string(), PriorityRange { min: 10, max: 30 });
    let rubric = RubricConfig {
        title_max_length: 30,
        max_steps: 10,
        priority_ratios: ratios,
        version: "1".to_string(),
        last_updated: String::new(),
    };

    let mut cases = Vec::new();
    for (count, label) in [(2, "P0"), (14, "P1"), (4, "P2")] {
        for i in 0..count {
            cases.push(TestCase {
                id: format!("{label}-{i}"),
                title: "t".to_string(),
                priority: label.to_string(),
                ..Default::default()
            });
        }
    }

    let analysis = analyze_priorities(&cases, &rubric);
    assert!((analysis.distribution["P0"].percentage - 10.0).abs() < 1e-9);
    assert!((analysis.distribution["P1"].percentage - 70.0).abs() < 1e-9);
    assert!((analysis.distribution["P2"].percentage - 20.0).abs() < 1e-9);
    assert!(analysis.is_compliant);
}

#[test]
fn test_time_trend_scenario() {
    // Stories created on the 1st (twice) and the 2nd; count chart over the
    // two days yields totals 2 and 1 plus a PNG under local_data/time_trend.
    let temp = TempDir::new().expect("temp dir");
    let paths = ProjectPaths::at(temp.path());

    let dataset = IssueDataset {
        stories: vec![
            Story {
                id: "1".to_string(),
                name: "a".to_string(),
                created: "2025-01-01 08:00:00".to_string(),
                ..Default::default()
            },
            Story {
                id: "2".to_string(),
                name: "b".to_string(),
                created: "2025-01-01 09:00:00".to_string(),
                ..Default::default()
            },
            Story {
                id: "3".to_string(),
                name: "c".to_string(),
                created: "2025-01-02 08:00:00".to_string(),
                ..Default::default()
            },
        ],
        bugs: Vec::new(),
    };

    let options = TrendOptions {
        since: chrono::NaiveDate::from_ymd_opt(2025, 1, 1),
        until: chrono::NaiveDate::from_ymd_opt(2025, 1, 2),
        ..Default::default()
    };
    let report = trend_with_chart(&dataset, &options, &paths).expect("trend failed");

    assert_eq!(report.days["2025-01-01"].total, 2);
    assert_eq!(report.days["2025-01-02"].total, 1);

    let chart = report.chart_path.expect("chart path");
    assert!(chart.contains("local_data"));
    assert!(chart.contains("story_count_"));
    assert!(std::path::Path::new(&chart).exists());
}

#[test]
fn test_markdown_table_scenario() {
    let reply = "\
### 用例ID: TC-7\n\n\
| 内容 | 评分(0-10) | 建议 |\n\
| --- | --- | --- |\n\
| 用例标题 | 8 | 补充模块前缀 |\n\
| 前置条件 | 6 | 说明账号状态 |\n\
| 步骤描述 | 9 | 无 |\n\
| 预期结果 | 7 | 增加断言 |\n";

    let tables = parse_tables(reply);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].rows.len(), 4);

    // A reply without any table parses to nothing rather than failing.
    assert!(parse_tables("没有表格的回复").is_empty());
}

#[test]
fn test_empty_dataset_operations_succeed() {
    let temp = TempDir::new().expect("temp dir");
    let paths = ProjectPaths::at(temp.path());
    let embedder = FallbackEmbedder::new(32);
    let empty = IssueDataset::default();

    let index =
        VectorIndex::build(&empty, 10, &embedder, &temp.path().join("idx")).expect("build");
    assert_eq!(index.stats().chunk_count, 0);

    let keywords = analyze_keywords(&empty, FieldScope::Core, 5);
    assert_eq!(keywords.total_tokens, 0);

    let trend = trend_with_chart(&empty, &TrendOptions::default(), &paths).expect("trend");
    assert_eq!(trend.kept_records, 0);
    assert!(trend.chart_path.is_none());

    // No half-written artifacts.
    let trend_dir = paths.time_trend_dir();
    let entries = std::fs::read_dir(&trend_dir)
        .map(|dir| dir.count())
        .unwrap_or(0);
    assert_eq!(entries, 0);
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Chunking covers every record exactly once, in order, for any
        /// chunk size.
        #[test]
        fn chunks_partition_records(stories in 0usize..40, bugs in 0usize..40, k in 1usize..12) {
            let dataset = IssueDataset {
                stories: (0..stories)
                    .map(|i| Story {
                        id: format!("S{i}"),
                        name: format!("story {i}"),
                        ..Default::default()
                    })
                    .collect(),
                bugs: (0..bugs)
                    .map(|i| Bug {
                        id: format!("B{i}"),
                        title: format!("bug {i}"),
                        ..Default::default()
                    })
                    .collect(),
            };

            let metas = VectorIndex::chunk_dataset(&dataset, k).expect("chunking failed");
            prop_assert_eq!(metas.len(), stories.div_ceil(k) + bugs.div_ceil(k));

            let ids: Vec<String> = metas.iter().flat_map(|m| m.item_ids.clone()).collect();
            let expected: Vec<String> = (0..stories)
                .map(|i| format!("S{i}"))
                .chain((0..bugs).map(|i| format!("B{i}")))
                .collect();
            prop_assert_eq!(ids, expected);

            for meta in &metas {
                prop_assert!(meta.item_count >= 1 && meta.item_count <= k);
                prop_assert_eq!(meta.item_count, meta.item_ids.len());
                prop_assert_eq!(meta.item_count, meta.original_items.len());
            }
        }

        /// The heuristic token estimate grows with input and never returns
        /// zero for non-empty text.
        #[test]
        fn estimate_tokens_positive(text in "[a-z\u{4e00}-\u{9fa5} ]{1,200}") {
            let tokens = issuelens::token::estimate_tokens(&text);
            if text.chars().any(|c| !c.is_whitespace()) {
                prop_assert!(tokens > 0);
            }
            prop_assert!(tokens <= text.chars().count());
        }
    }
}
