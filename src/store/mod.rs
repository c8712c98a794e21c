//! Flat-file storage: JSON blobs, the issue dataset, and spreadsheets.
//!
//! All persistent state lives in files. JSON writes are pretty-printed UTF-8
//! with non-ASCII preserved literally; spreadsheet reads remap tracker column
//! headers onto canonical field names.

mod dataset;
mod json;
mod sheet;

pub use dataset::load_dataset;
pub use json::{load_json, save_json};
pub use sheet::{read_sheet, SheetRecord};
