//! # issuelens
//!
//! Analytics engine over issue-tracker data (stories and bugs).
//!
//! issuelens ingests a flat-file issue dataset and exposes a small set of
//! analytical operations: semantic concept search over a persisted vector
//! index, keyword extraction, time-trend aggregation with chart output, and
//! token-budgeted LLM operations (project overviews and rubric-based
//! test-case evaluation).
//!
//! ## Features
//!
//! - **Vector search**: chunked records embedded with a multilingual
//!   sentence encoder, persisted as a flat inner-product index with sidecar
//!   metadata
//! - **Token budgeting**: exact or heuristic token counts drive greedy
//!   batch splits that never overrun the model's context window
//! - **Two LLM providers**: OpenAI-compatible chat completions with typed
//!   error classification; the client never retries on its own
//! - **Flat-file state**: JSON datasets and reports, no database

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod extract;
pub mod index;
pub mod model;
pub mod store;
pub mod token;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use config::ProjectPaths;
pub use model::{Bug, IssueDataset, IssueKind, IssueRecord, Story};

// Re-export index types
pub use index::{ChunkMeta, DEFAULT_CHUNK_SIZE, IndexStats, SearchHit, VectorIndex};

// Re-export embedding types
#[cfg(feature = "fastembed-embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use embedding::{
    DEFAULT_DIMENSIONS, DEFAULT_MODEL_NAME, Embedder, FallbackEmbedder, cosine_similarity,
    create_embedder,
};

// Re-export token accounting
pub use token::TokenCounter;

// Re-export API client types
pub use api::{ApiClient, CallOptions, Provider};

// Re-export evaluation types
pub use eval::{EvalReport, Evaluator, EvaluatorOptions, RubricConfig, TestCase};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
