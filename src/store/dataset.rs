//! Issue-dataset loading.

use std::path::Path;

use crate::config::ProjectPaths;
use crate::error::{Result, StoreError};
use crate::model::IssueDataset;

/// Loads the canonical issue dataset.
///
/// Accepts an absolute path or a project-relative one (resolved via
/// [`ProjectPaths::data_path`]). A missing file is
/// [`StoreError::InputMissing`] (the dataset is the authoritative input, an
/// empty default would mask a skipped ingestion step); a present but invalid
/// file is [`StoreError::InputMalformed`].
pub fn load_dataset(paths: &ProjectPaths, path: impl AsRef<Path>) -> Result<IssueDataset> {
    let resolved = paths.data_path(path);
    if !resolved.exists() {
        return Err(StoreError::InputMissing {
            path: resolved.display().to_string(),
        }
        .into());
    }

    let content = std::fs::read_to_string(&resolved).map_err(|e| StoreError::ReadFailed {
        path: resolved.display().to_string(),
        reason: e.to_string(),
    })?;

    let dataset: IssueDataset =
        serde_json::from_str(&content).map_err(|e| StoreError::InputMalformed {
            path: resolved.display().to_string(),
            reason: e.to_string(),
        })?;

    tracing::debug!(
        stories = dataset.stories.len(),
        bugs = dataset.bugs.len(),
        path = %resolved.display(),
        "loaded dataset"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_dataset_missing() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::at(temp.path());
        let err = load_dataset(&paths, "absent.json").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Store(StoreError::InputMissing { .. })
        ));
        assert!(err.suggestion().unwrap_or_default().contains("ingestion"));
    }

    #[test]
    fn test_load_dataset_relative_path() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::at(temp.path());
        std::fs::create_dir_all(temp.path().join("local_data")).unwrap();
        std::fs::write(
            temp.path().join("local_data/issues.json"),
            r#"{"stories":[{"id":"1","name":"n"}],"bugs":[]}"#,
        )
        .unwrap();

        let dataset = load_dataset(&paths, "local_data/issues.json").unwrap();
        assert_eq!(dataset.stories.len(), 1);
        assert!(dataset.bugs.is_empty());
    }

    #[test]
    fn test_load_dataset_absolute_path() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::at("/somewhere/else");
        let file = temp.path().join("issues.json");
        std::fs::write(&file, r#"{"stories":[],"bugs":[{"id":"9","title":"t"}]}"#).unwrap();

        let dataset = load_dataset(&paths, &file).unwrap();
        assert_eq!(dataset.bugs.len(), 1);
    }

    #[test]
    fn test_load_dataset_malformed() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::at(temp.path());
        let file = temp.path().join("issues.json");
        std::fs::write(&file, r#"{"stories": "not an array"}"#).unwrap();

        let err = load_dataset(&paths, &file).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Store(StoreError::InputMalformed { .. })
        ));
    }
}
