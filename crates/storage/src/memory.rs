//! In-memory [`PersistentData`] backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::data_id::DataId;
use crate::error::StorageError;
use crate::traits::PersistentData;

/// Blobs kept in a map. Serializes as a JSON object keyed by [`DataId::key`]
/// so fixtures stay readable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    blobs: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Raw view by host key, including keys this crate does not know.
    pub fn raw(&self) -> &BTreeMap<String, String> {
        &self.blobs
    }
}

impl PersistentData for MemoryStore {
    fn get(&self, id: DataId) -> Result<Option<String>, StorageError> {
        Ok(self.blobs.get(id.key()).cloned())
    }

    fn set(&mut self, id: DataId, blob: &str) -> Result<(), StorageError> {
        trace!(data_id = %id, len = blob.len(), "store blob");
        self.blobs.insert(id.key().to_owned(), blob.to_owned());
        Ok(())
    }

    fn remove(&mut self, id: DataId) -> Result<(), StorageError> {
        trace!(data_id = %id, "remove blob");
        self.blobs.remove(id.key());
        Ok(())
    }
}
