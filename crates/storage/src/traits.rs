use crate::data_id::DataId;
use crate::error::StorageError;

/// Persistence contract between a form document and its host.
///
/// Each [`DataId`] names at most one opaque string blob. Absence is
/// meaningful: a document without a form description blob is "no form",
/// which differs from an empty one, so callers delete rather than store
/// empty shells.
///
/// ## Semantics
///
/// - `get` of a never-written or removed id returns `Ok(None)`.
/// - `set` replaces any previous blob for the id.
/// - `remove` of an absent id is not an error.
/// - Ids are independent: writing one never affects another.
pub trait PersistentData: Send {
    fn get(&self, id: DataId) -> Result<Option<String>, StorageError>;

    fn set(&mut self, id: DataId, blob: &str) -> Result<(), StorageError>;

    fn remove(&mut self, id: DataId) -> Result<(), StorageError>;

    /// Ids that currently hold a blob.
    fn ids(&self) -> Result<Vec<DataId>, StorageError> {
        let mut out = Vec::new();
        for id in DataId::ALL {
            if self.get(id)?.is_some() {
                out.push(id);
            }
        }
        Ok(out)
    }

    /// Flush pending writes, if the backend buffers them.
    fn flush(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}
