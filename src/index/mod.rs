//! Semantic vector index over issue records.
//!
//! Records are grouped into fixed-size chunks per kind, each chunk embedded
//! as one vector, and the result persisted as three sidecar files sharing a
//! base path:
//!
//! - `<base>.index` - flat inner-product index (see [`flat`])
//! - `<base>.metadata.jsonl` - ordered chunk metadata, one JSON object per line
//! - `<base>.config.json` - descriptor with model name, counts and encoding
//!
//! Row *i* of the index always corresponds to metadata entry *i*; the loader
//! refuses sidecars that disagree. Rebuilds replace the sidecar set by
//! writing temporaries and renaming into place, so an aborted build leaves
//! the previous index usable.

mod flat;

pub use flat::FlatIndex;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::embedding::{Embedder, l2_normalize};
use crate::error::{IndexError, Result};
use crate::extract::canonical_text;
use crate::model::{IssueDataset, IssueKind};

/// Default number of records per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Separator joining record texts inside a chunk.
const CHUNK_TEXT_SEP: &str = " | ";

/// Metadata encoding recorded in the descriptor.
const METADATA_ENCODING: &str = "jsonl";

/// Metadata for one embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Identifier derived from kind, chunk index, and a content hash.
    pub chunk_id: String,
    /// Kind of the records in this chunk.
    pub kind: IssueKind,
    /// Position of the chunk within its kind (0-based).
    pub chunk_index: usize,
    /// Ids of the source records, in order.
    pub item_ids: Vec<String>,
    /// Number of source records.
    pub item_count: usize,
    /// Verbatim copies of the source records, for returning full context.
    pub original_items: Vec<Value>,
    /// Joined canonical text used for embedding.
    pub text: String,
}

/// Descriptor sidecar (`<base>.config.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Embedding model the vectors came from.
    pub model_name: String,
    /// Number of chunks (== metadata entries == index rows).
    pub chunk_count: usize,
    /// Vector dimensionality.
    pub vector_dimension: usize,
    /// ISO-8601 creation time.
    pub created_at: String,
    /// Encoding of the metadata sidecar.
    pub metadata_encoding: String,
}

/// One search result row.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    /// Metadata of the matched chunk, including the original records.
    pub meta: ChunkMeta,
}

/// Index statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of chunks.
    pub chunk_count: usize,
    /// Vector dimensionality.
    pub vector_dim: usize,
    /// Total records across all chunks.
    pub total_records: usize,
    /// Story chunk count.
    pub story_chunks: usize,
    /// Bug chunk count.
    pub bug_chunks: usize,
}

/// A persisted semantic index: vectors plus parallel chunk metadata.
#[derive(Debug)]
pub struct VectorIndex {
    base: PathBuf,
    index: FlatIndex,
    metadata: Vec<ChunkMeta>,
    descriptor: IndexDescriptor,
}

impl VectorIndex {
    /// Splits a dataset into chunk metadata without embedding.
    ///
    /// For each kind, consecutive groups of up to `chunk_size` records are
    /// flattened through the canonical extractor and joined with `" | "`.
    /// Chunk ids are stable for identical content, so rebuilding over the
    /// same dataset reproduces the same ids.
    pub fn chunk_dataset(dataset: &IssueDataset, chunk_size: usize) -> Result<Vec<ChunkMeta>> {
        if chunk_size == 0 {
            return Err(IndexError::BuildFailed {
                reason: "chunk size must be at least 1".to_string(),
            }
            .into());
        }

        let mut metas = Vec::new();
        for kind in [IssueKind::Story, IssueKind::Bug] {
            let records = dataset.records_of(kind);
            let texts: Vec<String> = records.par_iter().map(canonical_text).collect();

            for (chunk_index, group) in records.chunks(chunk_size).enumerate() {
                let start = chunk_index * chunk_size;
                let text = texts[start..start + group.len()].join(CHUNK_TEXT_SEP);
                metas.push(ChunkMeta {
                    chunk_id: chunk_id(kind, chunk_index, &text),
                    kind,
                    chunk_index,
                    item_ids: group.iter().map(|r| r.id().to_string()).collect(),
                    item_count: group.len(),
                    original_items: group.iter().map(crate::model::IssueRecord::to_value).collect(),
                    text,
                });
            }
        }
        Ok(metas)
    }

    /// Builds the index from a dataset and persists the sidecar set.
    ///
    /// All chunk texts are embedded in one batch and L2-normalized before
    /// insertion. The new sidecars replace any previous set atomically; on
    /// failure before the swap the previous index stays in place.
    pub fn build(
        dataset: &IssueDataset,
        chunk_size: usize,
        embedder: &dyn Embedder,
        base: &Path,
    ) -> Result<Self> {
        let metas = Self::chunk_dataset(dataset, chunk_size)?;
        tracing::info!(
            chunks = metas.len(),
            stories = dataset.stories.len(),
            bugs = dataset.bugs.len(),
            "building vector index"
        );

        let texts: Vec<&str> = metas.iter().map(|m| m.text.as_str()).collect();
        let mut embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&texts)?
        };

        let mut index = FlatIndex::new(embedder.dimensions());
        for embedding in &mut embeddings {
            l2_normalize(embedding);
            index.add(embedding)?;
        }

        let descriptor = IndexDescriptor {
            model_name: embedder.model_name().to_string(),
            chunk_count: metas.len(),
            vector_dimension: embedder.dimensions(),
            created_at: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%z").to_string(),
            metadata_encoding: METADATA_ENCODING.to_string(),
        };

        let built = Self {
            base: base.to_path_buf(),
            index,
            metadata: metas,
            descriptor,
        };
        built.write_sidecars()?;
        Ok(built)
    }

    /// Loads a persisted index and verifies the sidecars agree.
    ///
    /// # Errors
    ///
    /// - [`IndexError::NotBuilt`] when `<base>.index` does not exist
    /// - [`IndexError::Incompatible`] when the stored dimension differs from
    ///   the embedder's
    /// - [`IndexError::Corrupt`] when any sidecar is missing, unreadable, or
    ///   the row/metadata/descriptor counts disagree
    pub fn load(base: &Path, embedder: &dyn Embedder) -> Result<Self> {
        let index_path = Self::index_path(base);
        if !index_path.exists() {
            return Err(IndexError::NotBuilt {
                base: base.display().to_string(),
            }
            .into());
        }

        let descriptor = Self::read_descriptor(base)?;
        if descriptor.vector_dimension != embedder.dimensions() {
            return Err(IndexError::Incompatible {
                stored: descriptor.vector_dimension,
                model: embedder.dimensions(),
            }
            .into());
        }

        let metadata = Self::read_metadata(base)?;
        let index = FlatIndex::load(&index_path)?;

        if index.len() != metadata.len() || descriptor.chunk_count != metadata.len() {
            return Err(IndexError::Corrupt {
                reason: format!(
                    "{} index rows, {} metadata entries, descriptor says {}",
                    index.len(),
                    metadata.len(),
                    descriptor.chunk_count
                ),
            }
            .into());
        }

        Ok(Self {
            base: base.to_path_buf(),
            index,
            metadata,
            descriptor,
        })
    }

    /// Searches the index for the `top_k` chunks closest to `query`.
    ///
    /// The query is embedded and L2-normalized, so scores are cosine
    /// similarities in [-1, 1], returned in descending order. Only valid
    /// rows are returned; fewer than `top_k` hits simply yield a shorter
    /// list.
    pub fn search(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut embedding = embedder.embed(query)?;
        l2_normalize(&mut embedding);

        let hits = self
            .index
            .search(&embedding, top_k)
            .into_iter()
            .filter_map(|(row, score)| {
                self.metadata.get(row).map(|meta| SearchHit {
                    score,
                    meta: meta.clone(),
                })
            })
            .collect();
        Ok(hits)
    }

    /// Reports chunk and record counts.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            chunk_count: self.metadata.len(),
            vector_dim: self.descriptor.vector_dimension,
            total_records: self.metadata.iter().map(|m| m.item_count).sum(),
            story_chunks: self
                .metadata
                .iter()
                .filter(|m| m.kind == IssueKind::Story)
                .count(),
            bug_chunks: self
                .metadata
                .iter()
                .filter(|m| m.kind == IssueKind::Bug)
                .count(),
        }
    }

    /// Returns the ordered chunk metadata.
    #[must_use]
    pub fn metadata(&self) -> &[ChunkMeta] {
        &self.metadata
    }

    /// Returns the descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    /// Returns the raw vector store.
    #[must_use]
    pub const fn flat(&self) -> &FlatIndex {
        &self.index
    }

    fn index_path(base: &Path) -> PathBuf {
        with_suffix(base, ".index")
    }

    fn metadata_path(base: &Path) -> PathBuf {
        with_suffix(base, ".metadata.jsonl")
    }

    fn descriptor_path(base: &Path) -> PathBuf {
        with_suffix(base, ".config.json")
    }

    /// Writes the three sidecars as temporaries, then renames into place.
    fn write_sidecars(&self) -> Result<()> {
        if let Some(parent) = self.base.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IndexError::BuildFailed {
                reason: format!("create {}: {e}", parent.display()),
            })?;
        }

        let index_path = Self::index_path(&self.base);
        let metadata_path = Self::metadata_path(&self.base);
        let descriptor_path = Self::descriptor_path(&self.base);

        let index_tmp = with_suffix(&index_path, ".tmp");
        let metadata_tmp = with_suffix(&metadata_path, ".tmp");
        let descriptor_tmp = with_suffix(&descriptor_path, ".tmp");

        self.index.save(&index_tmp)?;

        let mut metadata_file =
            std::fs::File::create(&metadata_tmp).map_err(|e| IndexError::BuildFailed {
                reason: format!("create {}: {e}", metadata_tmp.display()),
            })?;
        for meta in &self.metadata {
            let line = serde_json::to_string(meta).map_err(|e| IndexError::BuildFailed {
                reason: format!("encode metadata: {e}"),
            })?;
            writeln!(metadata_file, "{line}").map_err(|e| IndexError::BuildFailed {
                reason: format!("write {}: {e}", metadata_tmp.display()),
            })?;
        }

        let descriptor_body =
            serde_json::to_string_pretty(&self.descriptor).map_err(|e| IndexError::BuildFailed {
                reason: format!("encode descriptor: {e}"),
            })?;
        std::fs::write(&descriptor_tmp, descriptor_body).map_err(|e| IndexError::BuildFailed {
            reason: format!("write {}: {e}", descriptor_tmp.display()),
        })?;

        // Rename into place; the .index file goes last so readers that probe
        // for it never observe a newer index with older sidecars.
        for (tmp, target) in [
            (&metadata_tmp, &metadata_path),
            (&descriptor_tmp, &descriptor_path),
            (&index_tmp, &index_path),
        ] {
            std::fs::rename(tmp, target).map_err(|e| IndexError::BuildFailed {
                reason: format!("rename {} -> {}: {e}", tmp.display(), target.display()),
            })?;
        }

        tracing::info!(base = %self.base.display(), chunks = self.metadata.len(), "index persisted");
        Ok(())
    }

    fn read_descriptor(base: &Path) -> Result<IndexDescriptor> {
        let path = Self::descriptor_path(base);
        let content = std::fs::read_to_string(&path).map_err(|e| IndexError::Corrupt {
            reason: format!("descriptor {}: {e}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| {
            IndexError::Corrupt {
                reason: format!("descriptor {}: {e}", path.display()),
            }
            .into()
        })
    }

    fn read_metadata(base: &Path) -> Result<Vec<ChunkMeta>> {
        let path = Self::metadata_path(base);
        let file = std::fs::File::open(&path).map_err(|e| IndexError::Corrupt {
            reason: format!("metadata {}: {e}", path.display()),
        })?;

        let mut metas = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| IndexError::Corrupt {
                reason: format!("metadata {} line {}: {e}", path.display(), line_no + 1),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let meta: ChunkMeta = serde_json::from_str(&line).map_err(|e| IndexError::Corrupt {
                reason: format!("metadata {} line {}: {e}", path.display(), line_no + 1),
            })?;
            metas.push(meta);
        }
        Ok(metas)
    }
}

/// Appends a literal suffix to a path (the base path has no extension).
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// Derives a stable chunk identifier from kind, position, and content.
fn chunk_id(kind: IssueKind, chunk_index: usize, text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let digest = format!("{:016x}", hasher.finish());
    format!("{}_{}_{}", kind.label(), chunk_index, &digest[..8])
}
