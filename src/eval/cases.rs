//! Test-case loading from tracker spreadsheet exports.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::store::{SheetRecord, read_sheet};

/// Tracker column -> canonical field mapping for test-case sheets.
pub const CASE_COLUMNS: [(&str, &str); 6] = [
    ("用例ID", "id"),
    ("用例标题", "title"),
    ("前置条件", "precondition"),
    ("步骤描述", "steps"),
    ("预期结果", "expected"),
    ("等级", "priority"),
];

/// One normalized test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Case id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Precondition.
    pub precondition: String,
    /// Step description.
    pub steps: String,
    /// Expected result.
    pub expected: String,
    /// Priority label (e.g. P0/P1/P2).
    pub priority: String,
}

impl TestCase {
    fn from_record(record: &SheetRecord) -> Self {
        let get = |field: &str| record.get(field).cloned().unwrap_or_default();
        Self {
            id: get("id"),
            title: get("title"),
            precondition: get("precondition"),
            steps: get("steps"),
            expected: get("expected"),
            priority: get("priority"),
        }
    }
}

/// Loads test cases from a spreadsheet, remapping tracker columns.
///
/// Rows with no content in any mapped column are dropped by the sheet
/// reader; a workbook that yields zero cases is an error (an empty
/// evaluation run is always a mistake upstream).
pub fn load_cases(path: &Path) -> Result<Vec<TestCase>> {
    let records = read_sheet(path, &CASE_COLUMNS)?;
    let cases: Vec<TestCase> = records.iter().map(TestCase::from_record).collect();
    if cases.is_empty() {
        return Err(EvalError::NoCases {
            path: path.display().to_string(),
        }
        .into());
    }
    tracing::info!(cases = cases.len(), path = %path.display(), "loaded test cases");
    Ok(cases)
}
