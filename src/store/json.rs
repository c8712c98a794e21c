//! JSON blob load/save.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Loads a JSON object from disk.
///
/// Returns an empty mapping when the file does not exist. Fails with
/// [`StoreError::InputMalformed`] when the file exists but is not a JSON
/// object.
pub fn load_json(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| StoreError::ReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let value: Value =
        serde_json::from_str(&content).map_err(|e| StoreError::InputMalformed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InputMalformed {
            path: path.display().to_string(),
            reason: format!("expected a JSON object, found {}", type_name(&other)),
        }
        .into()),
    }
}

/// Saves a value as pretty-printed JSON, creating parent directories.
///
/// Non-ASCII characters are written literally (UTF-8), not escaped.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::DirectoryFailed {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })?;
    }

    let mut body = serde_json::to_string_pretty(value).map_err(StoreError::from)?;
    body.push('\n');

    std::fs::write(path, body).map_err(|e| StoreError::WriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    tracing::debug!(path = %path.display(), "wrote json");
    Ok(())
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
