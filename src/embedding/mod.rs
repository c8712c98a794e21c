//! Sentence embeddings for the vector index.
//!
//! Provides embedding generation using fastembed (when available) or a
//! hash-based fallback for deterministic pseudo-embeddings.
//!
//! # Feature Flags
//!
//! - `fastembed-embeddings`: Enables `FastEmbed` with the multilingual MiniLM
//!   sentence encoder (384 dimensions), cached under the project `models/`
//!   directory
//! - Without the feature: Uses hash-based fallback (deterministic but not
//!   semantic)

mod fallback;

#[cfg(feature = "fastembed-embeddings")]
mod fastembed_impl;

pub use fallback::FallbackEmbedder;

#[cfg(feature = "fastembed-embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

use crate::Result;
use crate::config::ProjectPaths;

/// Default embedding dimensions for the multilingual MiniLM encoder.
///
/// This is the authoritative source for embedding dimensions across the
/// codebase; index descriptors are validated against it at load time.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Canonical name of the default embedding model.
pub const DEFAULT_MODEL_NAME: &str = "paraphrase-multilingual-MiniLM-L12-v2";

/// Trait for embedding generators.
///
/// Implementations must be thread-safe (`Send + Sync`); the process-wide
/// model handle is shared across operations.
pub trait Embedder: Send + Sync {
    /// Returns the model name recorded in index descriptors.
    fn model_name(&self) -> &str;

    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generates embeddings for multiple texts.
    ///
    /// The default implementation calls `embed` for each text sequentially.
    /// Implementations may override this for batch optimization.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails for any text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Creates the default embedder based on available features.
///
/// - With `fastembed-embeddings`: Returns [`FastEmbedEmbedder`], caching the
///   model snapshot under the project `models/` directory
/// - Without: Returns [`FallbackEmbedder`]
///
/// # Errors
///
/// Returns an error if embedder initialization fails.
#[cfg(feature = "fastembed-embeddings")]
pub fn create_embedder(paths: &ProjectPaths) -> Result<Box<dyn Embedder>> {
    Ok(Box::new(FastEmbedEmbedder::new(paths)))
}

/// Creates the default embedder based on available features.
///
/// - With `fastembed-embeddings`: Returns `FastEmbedEmbedder`
/// - Without: Returns [`FallbackEmbedder`] (never fails)
#[cfg(not(feature = "fastembed-embeddings"))]
pub fn create_embedder(_paths: &ProjectPaths) -> Result<Box<dyn Embedder>> {
    Ok(Box::new(FallbackEmbedder::new(DEFAULT_DIMENSIONS)))
}

/// Scales a vector to unit L2 length in place.
///
/// Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for val in vector.iter_mut() {
            *val /= magnitude;
        }
    }
}

/// Computes cosine similarity between two embedding vectors.
///
/// Returns a value between -1.0 (opposite) and 1.0 (identical).
/// For normalized vectors (L2 norm = 1), this is equivalent to the dot
/// product. Returns 0.0 for mismatched lengths or zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
