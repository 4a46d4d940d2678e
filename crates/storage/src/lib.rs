//! formdoc-storage: the persistence contract for document data blobs.
//!
//! A form document keeps its derived state (form description, form values,
//! print functions, type tag, mail-merge settings) as named string blobs
//! attached to the document by the host. [`PersistentData`] is that
//! contract; [`MemoryStore`] is an in-memory implementation, and
//! [`conformance`] checks any implementation against the contract.

pub mod conformance;
mod data_id;
mod error;
mod memory;
mod traits;

pub use data_id::DataId;
pub use error::StorageError;
pub use memory::MemoryStore;
pub use traits::PersistentData;
