//! Retrieval-augmented query service.
//!
//! A prompt is embedded, matched against a vector index, resolved into
//! records with one batched store lookup, and composed into a deterministic
//! three-part response.
//!
//! ```rust,ignore
//! let config = ServiceConfig::load("config.toml")?;
//! let context = QueryContext::from_config(&config).await?;
//! let service = context.query_service(&config);
//! let reply = service.handle(br#"{"prompt": "find red shoes", "top_k": 2}"#).await;
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod query;
pub mod search;
pub mod store;
pub mod types;

pub use api::{build_router, ApiServer, AppState, HealthResponse};
pub use config::{
    ApiConfig, EmbeddingConfig, IndexBackend, IndexConfig, QueryConfig, ServiceConfig,
    StoreBackend, StoreConfig,
};
pub use context::QueryContext;
pub use error::{Error, Result};
pub use crate::metrics::MetricsService;
pub use query::{
    Query, QueryLimits, QueryReply, QueryService, ResponseComposer, ResponsePayload,
    RetrievalResult, Retriever,
};
pub use search::{
    CachedEmbedder, Embedder, Embedding, FastEmbedder, FlatIndex, IndexEntry, QdrantIndex,
    VectorIndex,
};
pub use store::{MemoryStore, RecordStore, RocksStore};
pub use types::{Candidate, Record, RecordId};
