//! Nearest-neighbour index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::{Candidate, RecordId};

/// k-nearest-neighbour search over indexed vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Dimension of indexed vectors.
    fn dimension(&self) -> usize;

    /// Return up to `k` candidates ordered by ascending distance.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<Candidate>>;
}

/// One indexed vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: RecordId,
    pub vector: Vec<f32>,
}

/// On-disk layout of a flat index file.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// Exact search by squared Euclidean distance over every entry.
///
/// Equal distances keep insertion order.
#[derive(Clone)]
pub struct FlatIndex {
    dimension: usize,
    entries: Arc<Vec<IndexEntry>>,
}

impl FlatIndex {
    /// Build an index, rejecting entries of the wrong dimension.
    pub fn new(dimension: usize, entries: Vec<IndexEntry>) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("index dimension must be positive".into()));
        }
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimension) {
            return Err(Error::Config(format!(
                "index entry '{}' has {} dimensions, expected {}",
                bad.id,
                bad.vector.len(),
                dimension
            )));
        }
        Ok(Self {
            dimension,
            entries: Arc::new(entries),
        })
    }

    /// Load an index from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let file: IndexFile = serde_json::from_slice(&content)?;
        let index = Self::new(file.dimension, file.entries)?;
        info!(
            path = %path.display(),
            entries = index.len(),
            dimension = index.dimension,
            "Flat index loaded"
        );
        Ok(index)
    }

    /// Write the index to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = IndexFile {
            dimension: self.dimension,
            entries: self.entries.as_ref().clone(),
        };
        std::fs::write(path, serde_json::to_vec(&file)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn scan(entries: &[IndexEntry], query: &[f32], k: usize) -> Vec<Candidate> {
        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, squared_l2(query, &entry.vector)))
            .collect();

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        scored
            .into_iter()
            .take(k)
            .map(|(pos, distance)| Candidate {
                id: entries[pos].id.clone(),
                distance,
            })
            .collect()
    }
}

#[async_trait]
impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<Candidate>> {
        if vector.len() != self.dimension {
            return Err(Error::IndexQuery(format!(
                "query vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let entries = Arc::clone(&self.entries);
        let query = vector.to_vec();
        tokio::task::spawn_blocking(move || Self::scan(&entries, &query, k))
            .await
            .map_err(|e| Error::IndexQuery(format!("search task failed: {}", e)))
    }
}

/// Squared Euclidean distance.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
