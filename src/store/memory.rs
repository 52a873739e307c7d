//! In-memory record store.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::RecordStore;
use crate::error::{Error, Result};
use crate::types::{Record, RecordId};

/// Records held in a `HashMap`, optionally loaded from a JSON array file.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: HashMap<RecordId, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records; a later duplicate id replaces an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.id().clone(), r))
            .collect();
        Self { records }
    }

    /// Load records from a JSON file holding an array of objects with `id`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let value: JsonValue = serde_json::from_slice(&content)?;
        let JsonValue::Array(items) = value else {
            return Err(Error::Config(format!(
                "record file {} must contain a JSON array",
                path.display()
            )));
        };
        let records = items
            .into_iter()
            .map(Record::from_json)
            .collect::<Result<Vec<_>>>()?;
        let store = Self::from_records(records);
        info!(path = %path.display(), records = store.len(), "Record file loaded");
        Ok(store)
    }

    pub fn insert(&mut self, record: Record) {
        self.records.insert(record.id().clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_many(&self, ids: &[RecordId]) -> Result<Vec<Record>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect())
    }
}
