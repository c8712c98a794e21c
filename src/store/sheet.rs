//! Spreadsheet reading with column remapping.
//!
//! Workbooks come straight from the tracker export, so headers are the
//! tracker's own (often Chinese) column names. Callers supply a
//! {source column → target field} mapping; the reader returns field-keyed
//! records and drops rows whose mapped fields are all empty.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{Result, StoreError};

/// One spreadsheet row after remapping: target field → cell text.
pub type SheetRecord = BTreeMap<String, String>;

/// Reads the first worksheet of a workbook, remapping columns.
///
/// The first row is the header. For every mapping entry whose source column
/// is present, the target field is filled from that column; missing cells
/// become empty strings. Columns not named in the mapping are ignored. Rows
/// with all mapped fields empty are dropped.
pub fn read_sheet(path: &Path, remap: &[(&str, &str)]) -> Result<Vec<SheetRecord>> {
    if !path.exists() {
        return Err(StoreError::InputMissing {
            path: path.display().to_string(),
        }
        .into());
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| StoreError::SheetFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| StoreError::SheetFailed {
            path: path.display().to_string(),
            reason: "workbook has no worksheets".to_string(),
        })?
        .map_err(|e| StoreError::SheetFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    // column index -> target field, for mapped columns only
    let mut columns: Vec<(usize, String)> = Vec::new();
    for (idx, cell) in header.iter().enumerate() {
        let name = cell_text(cell);
        if let Some((_, target)) = remap.iter().find(|(source, _)| *source == name.trim()) {
            columns.push((idx, (*target).to_string()));
        }
    }

    let mut records = Vec::new();
    for row in rows {
        let mut record = SheetRecord::new();
        for (_, target) in remap {
            record.insert((*target).to_string(), String::new());
        }
        for (idx, target) in &columns {
            let text = row.get(*idx).map(cell_text).unwrap_or_default();
            record.insert(target.clone(), text);
        }
        if record.values().any(|v| !v.trim().is_empty()) {
            records.push(record);
        }
    }

    tracing::debug!(rows = records.len(), path = %path.display(), "read sheet");
    Ok(records)
}

/// Renders a cell as trimmed text. Numbers lose a trailing `.0` so integer
/// ids survive the float round trip spreadsheets are prone to.
#[allow(clippy::cast_possible_truncation)]
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string().trim().to_string(),
    }
}
