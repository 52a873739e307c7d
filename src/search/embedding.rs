//! Text embedding.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use moka::future::Cache;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A dense embedding vector.
pub type Embedding = Vec<f32>;

/// Maps text to a fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed a single text.
    async fn encode(&self, text: &str) -> Result<Embedding>;
}

/// Local ONNX sentence embeddings via FastEmbed.
pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedder {
    /// Load a model by name, downloading it on first use.
    ///
    /// Blocking: call during startup, before serving.
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
        let (model, dimension) = resolve_model(model_name)?;

        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let embedding = TextEmbedding::try_new(options).map_err(|e| {
            Error::Embedding(format!("failed to load model '{}': {}", model_name, e))
        })?;

        info!(model = model_name, dimension, "Embedding model loaded");

        Ok(Self {
            model: Arc::new(embedding),
            model_name: model_name.to_string(),
            dimension,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Supported model names and their output dimensions.
fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok((EmbeddingModel::AllMiniLML6V2, 384))
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            Ok((EmbeddingModel::AllMiniLML12V2, 384))
        }
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" | "BAAI/bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        other => Err(Error::Config(format!("unsupported embedding model '{}'", other))),
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> Result<Embedding> {
        let model = Arc::clone(&self.model);
        let input = vec![text.to_string()];

        // ONNX inference is CPU-bound; keep it off the async workers.
        let mut vectors = tokio::task::spawn_blocking(move || model.embed(input, None))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {}", e)))?
            .map_err(|e| Error::Embedding(e.to_string()))?;

        let vector = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("model returned no embedding".into()))?;
        if vector.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "model returned {} dimensions, expected {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(vector)
    }
}

/// Embedder wrapper that memoizes vectors by exact input text.
///
/// Failures are never cached.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Cache<String, Embedding>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(capacity),
        }
    }

    /// Number of cached entries (approximate; pending maintenance excluded).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn encode(&self, text: &str) -> Result<Embedding> {
        if let Some(vector) = self.cache.get(text).await {
            debug!("Embedding cache hit");
            return Ok(vector);
        }

        let vector = self.inner.encode(text).await?;
        self.cache.insert(text.to_string(), vector.clone()).await;
        Ok(vector)
    }
}
