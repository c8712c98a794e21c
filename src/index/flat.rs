//! Flat inner-product vector store.
//!
//! A brute-force index over row-major float32 vectors. With L2-normalized
//! rows the inner product is cosine similarity, so a full scan returns exact
//! top-k results; at issue-tracker scale (thousands of chunks) this is faster
//! than maintaining a graph index and trivially reproducible across runs.
//!
//! On-disk format: 4-byte magic, u32 version, u32 dimensions, u64 row count,
//! then `count * dimensions` little-endian f32 values.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::{IndexError, Result};

/// File magic for the index format.
const MAGIC: &[u8; 4] = b"ILFI";
/// Current format version.
const VERSION: u32 = 1;

/// Flat inner-product index over float32 vectors.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dimensions: usize,
    /// Row-major vector data, `len() == rows * dimensions`.
    data: Vec<f32>,
}

impl FlatIndex {
    /// Creates an empty index with the given dimensionality.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    /// Returns the vector dimensionality.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns the number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    /// Returns true when no vectors are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends a vector as the next row.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::BuildFailed`] when the dimensions don't match.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(IndexError::BuildFailed {
                reason: format!(
                    "vector dimension {} does not match index dimension {}",
                    vector.len(),
                    self.dimensions
                ),
            }
            .into());
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Returns row `i`, if present.
    #[must_use]
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dimensions)?;
        let end = start + self.dimensions;
        self.data.get(start..end)
    }

    /// Returns the `k` rows with the highest inner product against `query`,
    /// as `(row_index, score)` pairs in descending score order.
    ///
    /// Returns fewer than `k` pairs when the index holds fewer rows; never
    /// emits sentinel rows.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if query.len() != self.dimensions || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|i| {
                let row = &self.data[i * self.dimensions..(i + 1) * self.dimensions];
                let dot: f32 = row.iter().zip(query.iter()).map(|(a, b)| a * b).sum();
                (i, dot)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Writes the index to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path).map_err(|e| IndexError::BuildFailed {
            reason: format!("create {}: {e}", path.display()),
        })?;

        let write = |file: &mut std::fs::File, bytes: &[u8]| -> Result<()> {
            file.write_all(bytes).map_err(|e| {
                IndexError::BuildFailed {
                    reason: format!("write {}: {e}", path.display()),
                }
                .into()
            })
        };

        let dimensions = u32::try_from(self.dimensions).map_err(|_| IndexError::BuildFailed {
            reason: format!("dimension {} exceeds the format limit", self.dimensions),
        })?;

        write(&mut file, MAGIC)?;
        write(&mut file, &VERSION.to_le_bytes())?;
        write(&mut file, &dimensions.to_le_bytes())?;
        write(&mut file, &(self.len() as u64).to_le_bytes())?;
        for value in &self.data {
            write(&mut file, &value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Reads an index from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Corrupt`] on any structural mismatch.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = std::fs::File::open(path).map_err(|e| IndexError::Corrupt {
            reason: format!("open {}: {e}", path.display()),
        })?;

        let mut header = [0u8; 4 + 4 + 4 + 8];
        file.read_exact(&mut header)
            .map_err(|e| IndexError::Corrupt {
                reason: format!("short header in {}: {e}", path.display()),
            })?;

        if &header[0..4] != MAGIC {
            return Err(IndexError::Corrupt {
                reason: format!("bad magic in {}", path.display()),
            }
            .into());
        }

        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != VERSION {
            return Err(IndexError::Corrupt {
                reason: format!("unsupported index version {version}"),
            }
            .into());
        }

        let dimensions = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
        let count = u64::from_le_bytes([
            header[12], header[13], header[14], header[15], header[16], header[17], header[18],
            header[19],
        ]) as usize;

        let mut raw = Vec::new();
        file.read_to_end(&mut raw).map_err(|e| IndexError::Corrupt {
            reason: format!("read {}: {e}", path.display()),
        })?;

        let expected = count
            .checked_mul(dimensions)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| IndexError::Corrupt {
                reason: "vector payload size overflow".to_string(),
            })?;
        if raw.len() != expected {
            return Err(IndexError::Corrupt {
                reason: format!(
                    "vector payload is {} bytes, expected {expected}",
                    raw.len()
                ),
            }
            .into());
        }

        let data = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self { dimensions, data })
    }
}
