//! Process-wide collaborator handles.
//!
//! Built once at startup from [`ServiceConfig`] and shared read-only by every
//! request.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{IndexBackend, ServiceConfig, StoreBackend};
use crate::error::{Error, Result};
use crate::query::{QueryLimits, QueryService, Retriever};
use crate::search::{CachedEmbedder, Embedder, FastEmbedder, FlatIndex, QdrantIndex, VectorIndex};
use crate::store::{MemoryStore, RecordStore, RocksStore};

/// Embedder, vector index and record store for the query path.
#[derive(Clone)]
pub struct QueryContext {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub store: Arc<dyn RecordStore>,
}

impl QueryContext {
    /// Assemble a context, checking that embedder and index agree on dimension.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        if embedder.dimension() != index.dimension() {
            return Err(Error::Config(format!(
                "embedder produces {} dimensions but the index holds {}",
                embedder.dimension(),
                index.dimension()
            )));
        }
        Ok(Self {
            embedder,
            index,
            store,
        })
    }

    /// Load every collaborator named by the configuration.
    ///
    /// Model loading and index loading block; call before serving.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let embedding = config.embedding.clone();
        let model = tokio::task::spawn_blocking(move || {
            FastEmbedder::new(&embedding.model, embedding.cache_dir)
        })
        .await
        .map_err(|e| Error::Embedding(format!("model loading task failed: {}", e)))??;

        let dimension = model.dimension();
        let embedder: Arc<dyn Embedder> = if config.embedding.cache_capacity > 0 {
            Arc::new(CachedEmbedder::new(
                Arc::new(model),
                config.embedding.cache_capacity,
            ))
        } else {
            Arc::new(model)
        };

        let index: Arc<dyn VectorIndex> = match config.index.backend {
            IndexBackend::Flat => Arc::new(FlatIndex::load(&config.index.path)?),
            IndexBackend::Qdrant => {
                let collection = config.index.collection.clone().ok_or_else(|| {
                    Error::Config("index.collection is required for the qdrant backend".into())
                })?;
                Arc::new(QdrantIndex::connect(
                    &config.index.qdrant_url,
                    collection,
                    dimension,
                )?)
            }
        };

        let store: Arc<dyn RecordStore> = match config.store.backend {
            StoreBackend::Rocksdb => Arc::new(RocksStore::open(&config.store.path)?),
            StoreBackend::Json => Arc::new(MemoryStore::load_json(&config.store.path)?),
        };

        info!(
            index = ?config.index.backend,
            store = ?config.store.backend,
            dimension,
            "Query context ready"
        );

        Self::new(embedder, index, store)
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.index),
            Arc::clone(&self.store),
        )
    }

    /// Build the query service with the configured limits and deadline.
    pub fn query_service(&self, config: &ServiceConfig) -> QueryService {
        let service = QueryService::new(self.retriever(), QueryLimits::from(&config.query));
        match config.api.request_timeout_secs {
            0 => service,
            secs => service.with_timeout(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Embedding, IndexEntry};
    use crate::types::RecordId;
    use async_trait::async_trait;

    struct ThreeDimEmbedder;

    #[async_trait]
    impl Embedder for ThreeDimEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn encode(&self, _text: &str) -> Result<Embedding> {
            Ok(vec![0.0; 3])
        }
    }

    fn index(dimension: usize) -> Arc<dyn VectorIndex> {
        Arc::new(
            FlatIndex::new(
                dimension,
                vec![IndexEntry {
                    id: RecordId::from(1u64),
                    vector: vec![0.0; dimension],
                }],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let result = QueryContext::new(
            Arc::new(ThreeDimEmbedder),
            index(2),
            Arc::new(MemoryStore::new()),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_query_service_uses_config_limits() {
        let context = QueryContext::new(
            Arc::new(ThreeDimEmbedder),
            index(3),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();

        let mut config = ServiceConfig::default();
        config.query.default_top_k = 2;
        config.query.max_top_k = 4;

        let limits = context.query_service(&config).limits();
        assert_eq!(limits.default_top_k, 2);
        assert_eq!(limits.max_top_k, 4);
    }
}
