//! Record store layer.
//!
//! A record store resolves batches of identifiers into full records. It is
//! read-only from the query path's point of view and makes no ordering
//! promise: callers re-order results themselves.

mod memory;
mod rocks;

pub use memory::MemoryStore;
pub use rocks::RocksStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Record, RecordId};

/// Batched point lookups keyed by identifier.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch every record whose identifier is in `ids`, in one round trip.
    ///
    /// Unknown identifiers are silently absent from the result; only a
    /// failure of the lookup as a whole is an error.
    async fn fetch_many(&self, ids: &[RecordId]) -> Result<Vec<Record>>;
}
