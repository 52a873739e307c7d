//! Vector search layer.
//!
//! Turns a prompt into ranked candidate identifiers using:
//! - an [`Embedder`] mapping text to a fixed-length vector
//!   (FastEmbed locally, optionally fronted by an in-memory cache)
//! - a [`VectorIndex`] answering k-nearest-neighbour queries
//!   (exact flat L2 scan, or a Qdrant collection)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌────────────────┐
//! │     Prompt      │────▶│ CachedEmbedder │──(miss)──▶ FastEmbedder
//! │   (text data)   │     │     (moka)     │
//! └─────────────────┘     └───────┬────────┘
//!                                 │
//!                                 ▼
//!                         ┌──────────────┐
//!                         │   Embedding  │
//!                         │  [f32; 384]  │
//!                         └──────┬───────┘
//!                                │
//!                   ┌────────────┴────────────┐
//!                   ▼                         ▼
//!             ┌──────────┐              ┌──────────┐
//!             │ FlatIndex│              │  Qdrant  │
//!             │ (L2 scan)│              │  Index   │
//!             └──────────┘              └──────────┘
//!                   │                         │
//!                   └────────────┬────────────┘
//!                                ▼
//!                        ┌──────────────┐
//!                        │  Candidates  │
//!                        │ (id, dist) ↑ │
//!                        └──────────────┘
//! ```

mod embedding;
mod index;
mod qdrant;

pub use embedding::{CachedEmbedder, Embedder, Embedding, FastEmbedder};
pub use index::{FlatIndex, IndexEntry, VectorIndex};
pub use qdrant::QdrantIndex;

/// Default embedding model (all-MiniLM-L6-v2 - 384 dimensions, good balance of speed/quality)
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Embedding dimension for the default model
pub const EMBEDDING_DIM: usize = 384;
