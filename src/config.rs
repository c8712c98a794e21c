//! Project path resolution and working-directory layout.
//!
//! All artifacts live under the project root: `local_data/` for datasets,
//! index sidecars and reports, `models/` for the embedding-model and
//! tokenizer snapshots, `config/` for the rubric and requirement files.

use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Directory holding generated artifacts.
pub const LOCAL_DATA_DIR: &str = "local_data";
/// Subdirectory holding vector-index sidecars.
pub const VECTOR_DATA_DIR: &str = "vector_data";
/// Subdirectory holding time-trend charts.
pub const TIME_TREND_DIR: &str = "time_trend";
/// Directory holding model snapshots.
pub const MODELS_DIR: &str = "models";
/// Directory holding rubric and requirement configuration.
pub const CONFIG_DIR: &str = "config";

/// Resolved project paths.
///
/// Created once per operation via [`ProjectPaths::discover`] (walks upward
/// from the current directory) or [`ProjectPaths::at`] for an explicit root.
///
/// # Examples
///
/// ```
/// use issuelens::config::ProjectPaths;
///
/// let paths = ProjectPaths::at("/tmp/project");
/// assert!(paths.vector_base("issues").ends_with("local_data/vector_data/issues"));
/// ```
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    /// Discovers the project root by walking upward from the current
    /// directory until a directory containing `local_data/`, `config/`, or a
    /// `Cargo.toml` is found. Falls back to the starting directory.
    pub fn discover() -> Result<Self> {
        let start = std::env::current_dir().map_err(|e| StoreError::DirectoryFailed {
            path: ".".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::discover_from(&start))
    }

    /// Discovers the project root starting from an explicit directory.
    #[must_use]
    pub fn discover_from(start: &Path) -> Self {
        let mut dir = start;
        loop {
            if dir.join(LOCAL_DATA_DIR).is_dir()
                || dir.join(CONFIG_DIR).is_dir()
                || dir.join("Cargo.toml").is_file()
            {
                return Self {
                    root: dir.to_path_buf(),
                };
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => {
                    return Self {
                        root: start.to_path_buf(),
                    };
                }
            }
        }
    }

    /// Uses an explicit directory as the project root.
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a data file path: absolute paths pass through, relative
    /// paths resolve against the project root.
    #[must_use]
    pub fn data_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        let rel = rel.as_ref();
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }

    /// Returns the base path for a named vector index:
    /// `local_data/vector_data/<name>`.
    #[must_use]
    pub fn vector_base(&self, name: &str) -> PathBuf {
        self.root.join(LOCAL_DATA_DIR).join(VECTOR_DATA_DIR).join(name)
    }

    /// Returns the directory for time-trend chart images.
    #[must_use]
    pub fn time_trend_dir(&self) -> PathBuf {
        self.root.join(LOCAL_DATA_DIR).join(TIME_TREND_DIR)
    }

    /// Returns the embedding-model cache directory.
    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.root.join(MODELS_DIR)
    }

    /// Returns the local tokenizer snapshot directory: `models/tokenizer`.
    #[must_use]
    pub fn tokenizer_dir(&self) -> PathBuf {
        self.root.join(MODELS_DIR).join("tokenizer")
    }

    /// Resolves a file under `config/`.
    #[must_use]
    pub fn config_path(&self, file: &str) -> PathBuf {
        self.root.join(CONFIG_DIR).join(file)
    }

    /// Returns the evaluation report path for a timestamp:
    /// `local_data/Proceed_TestCase_<ts>.json`.
    #[must_use]
    pub fn eval_output_path(&self, timestamp: &str) -> PathBuf {
        self.root
            .join(LOCAL_DATA_DIR)
            .join(format!("Proceed_TestCase_{timestamp}.json"))
    }

    /// Creates the working directories if missing: `local_data/`,
    /// `local_data/vector_data/`, `local_data/time_trend/`, `models/`.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.root.join(LOCAL_DATA_DIR),
            self.root.join(LOCAL_DATA_DIR).join(VECTOR_DATA_DIR),
            self.time_trend_dir(),
            self.models_dir(),
        ] {
            if !dir.is_dir() {
                tracing::debug!(path = %dir.display(), "creating directory");
                std::fs::create_dir_all(&dir).map_err(|e| StoreError::DirectoryFailed {
                    path: dir.display().to_string(),
                    reason: e.to_string(),
                })?;
            }
        }
        Ok(())
    }
}
