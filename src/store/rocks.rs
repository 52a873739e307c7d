//! RocksDB-backed record store.
//!
//! Keys are identifier bytes; values are the record fields as a JSON object.

use async_trait::async_trait;
use rocksdb::{Options, DB};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::RecordStore;
use crate::error::{Error, Result};
use crate::types::{Record, RecordId};

/// Record store over a RocksDB database.
///
/// `DB` is safe for concurrent reads; the handle is shared across requests.
#[derive(Clone)]
pub struct RocksStore {
    db: Arc<DB>,
}

impl RocksStore {
    /// Open (or create) a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| {
            Error::Store(format!("failed to open {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Record store opened");

        Ok(Self { db: Arc::new(db) })
    }

    /// Write a record, replacing any existing value for its id.
    pub fn put(&self, record: &Record) -> Result<()> {
        let value = serde_json::to_vec(record.fields())?;
        self.db
            .put(record.id().as_str().as_bytes(), value)
            .map_err(|e| Error::Store(e.to_string()))
    }

    fn decode(id: RecordId, bytes: &[u8]) -> Result<Record> {
        let fields: Map<String, JsonValue> = serde_json::from_slice(bytes)
            .map_err(|e| Error::Store(format!("undecodable record '{}': {}", id, e)))?;
        Ok(Record::new(id, fields))
    }
}

#[async_trait]
impl RecordStore for RocksStore {
    async fn fetch_many(&self, ids: &[RecordId]) -> Result<Vec<Record>> {
        let db = Arc::clone(&self.db);
        let keys = ids.to_vec();

        tokio::task::spawn_blocking(move || -> Result<Vec<Record>> {
            let results = db.multi_get(keys.iter().map(|id| id.as_str().as_bytes()));

            let mut records = Vec::with_capacity(keys.len());
            for (id, result) in keys.into_iter().zip(results) {
                if let Some(bytes) = result.map_err(|e| Error::Store(e.to_string()))? {
                    records.push(Self::decode(id, &bytes)?);
                }
            }
            Ok(records)
        })
        .await
        .map_err(|e| Error::Store(format!("lookup task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_fetch_many() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();

        for (id, description) in [(1u64, "one"), (2, "two"), (3, "three")] {
            let record =
                Record::from_json(json!({ "id": id, "description": description })).unwrap();
            store.put(&record).unwrap();
        }

        let ids = vec![RecordId::from(3u64), RecordId::from(9u64), RecordId::from(1u64)];
        let records = store.fetch_many(&ids).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description().unwrap(), "three");
        assert_eq!(records[1].description().unwrap(), "one");
    }

    #[tokio::test]
    async fn test_undecodable_value_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        store.db.put(b"5", b"not json").unwrap();

        let result = store.fetch_many(&[RecordId::from(5u64)]).await;
        assert!(matches!(result, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn test_empty_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        assert!(store.fetch_many(&[]).await.unwrap().is_empty());
    }
}
