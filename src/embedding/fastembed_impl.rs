//! `FastEmbed`-based semantic embedder.
//!
//! Provides real multilingual embeddings via fastembed-rs. Only available
//! when the `fastembed-embeddings` feature is enabled. The model snapshot is
//! cached under the project `models/` directory in the hub layout
//! (`models--<org>--<name>/snapshots/<sha>/`); the first request downloads
//! it once, subsequent requests load the local snapshot.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::Result;
use crate::config::ProjectPaths;
use crate::embedding::{DEFAULT_DIMENSIONS, DEFAULT_MODEL_NAME, Embedder};
use crate::error::IndexError;

/// Thread-safe singleton for the embedding model.
/// Uses `OnceLock` for lazy initialization on first use.
static EMBEDDING_MODEL: OnceLock<std::sync::Mutex<fastembed::TextEmbedding>> = OnceLock::new();

/// `FastEmbed` embedder using the multilingual MiniLM sentence encoder.
///
/// The model is lazily loaded on first embed call to preserve cold start
/// time; the handle is process-wide and read-only after initialization.
pub struct FastEmbedEmbedder {
    /// Snapshot cache directory (the project `models/` dir).
    cache_dir: PathBuf,
}

impl FastEmbedEmbedder {
    /// Creates a new `FastEmbed` embedder caching under `models/`.
    ///
    /// Note: the model is lazily loaded on the first `embed()` call.
    #[must_use]
    pub fn new(paths: &ProjectPaths) -> Self {
        Self {
            cache_dir: paths.models_dir(),
        }
    }

    /// Gets or initializes the embedding model (thread-safe).
    ///
    /// The model is loaded lazily on first use. Subsequent calls return the
    /// cached instance regardless of the cache directory they were created
    /// with; the handle is a process-wide singleton.
    fn get_model(&self) -> Result<&'static std::sync::Mutex<fastembed::TextEmbedding>> {
        // Check if already initialized
        if let Some(model) = EMBEDDING_MODEL.get() {
            return Ok(model);
        }

        tracing::info!(
            cache_dir = %self.cache_dir.display(),
            model = DEFAULT_MODEL_NAME,
            "loading embedding model"
        );

        let options =
            fastembed::InitOptions::new(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2)
                .with_cache_dir(self.cache_dir.clone())
                .with_show_download_progress(false);

        let model = fastembed::TextEmbedding::try_new(options)
            .map_err(|e| IndexError::Embedding(format!("failed to load embedding model: {e}")))?;

        // Store the model, ignoring if another thread beat us to it
        let _ = EMBEDDING_MODEL.set(std::sync::Mutex::new(model));

        // Return the (possibly other thread's) model
        EMBEDDING_MODEL.get().ok_or_else(|| {
            IndexError::Embedding("model initialization race condition".to_string()).into()
        })
    }
}

impl Embedder for FastEmbedEmbedder {
    fn model_name(&self) -> &str {
        DEFAULT_MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        DEFAULT_DIMENSIONS
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text])?;
        embeddings.into_iter().next().ok_or_else(|| {
            IndexError::Embedding("no embedding returned from model".to_string()).into()
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if texts.iter().any(|t| t.is_empty()) {
            return Err(
                IndexError::Embedding("cannot embed empty text".to_string()).into(),
            );
        }

        let model = self.get_model()?;
        let mut model = model
            .lock()
            .map_err(|e| IndexError::Embedding(format!("failed to lock embedding model: {e}")))?;

        // Wrap ONNX runtime call in catch_unwind for graceful degradation.
        // ONNX runtime can panic on malformed inputs or internal errors.
        let result = catch_unwind(AssertUnwindSafe(|| model.embed(texts, None)));

        result
            .map_err(|panic_info| {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                crate::Error::Index(IndexError::Embedding(format!(
                    "ONNX runtime panic: {panic_msg}"
                )))
            })?
            .map_err(|e| {
                crate::Error::Index(IndexError::Embedding(format!("batch embedding failed: {e}")))
            })
    }
}
