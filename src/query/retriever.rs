//! Prompt → ranked records.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::search::{Embedder, VectorIndex};
use crate::store::RecordStore;
use crate::types::{Candidate, Record, RecordId};

/// Records in similarity-rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub records: Vec<Record>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Runs embed → search → batched lookup → re-order.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn RecordStore>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
        }
    }

    /// Retrieve up to `top_k` records for `prompt`, most similar first.
    ///
    /// The record store is called exactly once, with the de-duplicated
    /// candidate identifiers. Identifiers it cannot resolve are dropped.
    pub async fn retrieve(&self, prompt: &str, top_k: usize) -> Result<RetrievalResult> {
        if prompt.trim().is_empty() {
            return Err(Error::Validation("Prompt is required".into()));
        }
        if top_k == 0 {
            return Err(Error::Validation("top_k must be a positive integer".into()));
        }

        let vector = self.embedder.encode(prompt).await?;
        let candidates = self.index.search(&vector, top_k).await?;
        if candidates.len() > top_k {
            warn!(
                returned = candidates.len(),
                requested = top_k,
                "Index returned more candidates than requested"
            );
        }

        let ranked = rank_candidates(candidates, top_k);
        let ids: Vec<RecordId> = ranked.iter().map(|c| c.id.clone()).collect();

        let fetched = self.store.fetch_many(&ids).await?;
        let records = order_by_rank(&ranked, fetched);

        debug!(
            candidates = ranked.len(),
            resolved = records.len(),
            "Retrieval complete"
        );
        Ok(RetrievalResult { records })
    }
}

/// Ascending distance, index order on ties, first occurrence of each id,
/// at most `top_k` entries.
fn rank_candidates(mut candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    // Stable: a well-ordered index response is left untouched.
    candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .take(top_k)
        .collect()
}

/// Arrange store output to follow candidate rank, dropping unresolved ids
/// and anything the store returned that was not asked for.
fn order_by_rank(ranked: &[Candidate], fetched: Vec<Record>) -> Vec<Record> {
    let mut by_id: HashMap<RecordId, Record> = HashMap::with_capacity(fetched.len());
    for record in fetched {
        by_id.entry(record.id().clone()).or_insert(record);
    }
    ranked
        .iter()
        .filter_map(|c| by_id.remove(&c.id))
        .collect()
}
