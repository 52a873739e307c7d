//! Qdrant-backed nearest-neighbour index.

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{PointId, Query, QueryPointsBuilder};
use qdrant_client::Qdrant;
use tracing::{debug, info, warn};

use super::index::VectorIndex;
use crate::error::{Error, Result};
use crate::types::{Candidate, RecordId};

/// Queries an existing Qdrant collection.
///
/// The collection is expected to use cosine similarity; scores are reported
/// as distances `max(0, 1 - score)` and the server's ordering is kept.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Connect to a Qdrant server.
    pub fn connect(url: &str, collection: impl Into<String>, dimension: usize) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| Error::Config(format!("failed to build Qdrant client: {}", e)))?;
        let collection = collection.into();
        info!(url, collection = %collection, "Qdrant index configured");
        Ok(Self {
            client,
            collection,
            dimension,
        })
    }
}

fn point_id_to_record_id(id: Option<PointId>) -> Option<RecordId> {
    match id?.point_id_options? {
        PointIdOptions::Num(n) => Some(RecordId::from(n)),
        PointIdOptions::Uuid(uuid) => Some(RecordId::from(uuid)),
    }
}

fn score_to_distance(score: f32) -> f32 {
    (1.0 - score).max(0.0)
}

#[async_trait]
impl VectorIndex for QdrantIndex {
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

        let request = QueryPointsBuilder::new(self.collection.clone())
            .query(Query::new_nearest(vector.to_vec()))
            .limit(k as u64);

        let response = self
            .client
            .query(request)
            .await
            .map_err(|e| Error::IndexQuery(e.to_string()))?;

        debug!(hits = response.result.len(), "Qdrant query complete");

        let mut candidates = Vec::with_capacity(response.result.len());
        for point in response.result {
            match point_id_to_record_id(point.id) {
                Some(id) => candidates.push(Candidate {
                    id,
                    distance: score_to_distance(point.score),
                }),
                None => warn!("Qdrant returned a point without an id"),
            }
        }
        Ok(candidates)
    }
}
