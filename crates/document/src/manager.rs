//! Open documents, each behind its own lock.

use std::collections::HashMap;
use std::sync::Arc;

use formdoc_eval::FunctionLibrary;
use formdoc_storage::PersistentData;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::diagnostics::DiagnosticSink;
use crate::host::TextDocument;
use crate::model::DocumentModel;

/// A model shared between the event queue and other callers.
pub type SharedModel<D, S> = Arc<Mutex<DocumentModel<D, S>>>;

/// Every open document, keyed by a caller-chosen document key.
///
/// The manager holds the global function library and the diagnostic sink
/// handed to each model it opens. Mutating a model means taking its lock;
/// callers queue behind it rather than interleave.
pub struct DocumentManager<D, S> {
    global: Arc<FunctionLibrary>,
    diagnostics: Arc<dyn DiagnosticSink>,
    models: RwLock<HashMap<String, SharedModel<D, S>>>,
}

impl<D, S> DocumentManager<D, S>
where
    D: TextDocument + 'static,
    S: PersistentData + 'static,
{
    pub fn new(global: Arc<FunctionLibrary>, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        DocumentManager {
            global,
            diagnostics,
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Open and scan a document. An already open document with the same
    /// key is returned unchanged and `doc`/`data` are dropped.
    pub async fn open(&self, key: &str, doc: D, data: S) -> SharedModel<D, S> {
        let mut models = self.models.write().await;
        if let Some(existing) = models.get(key) {
            debug!(key, "document already open");
            return Arc::clone(existing);
        }
        let model = DocumentModel::open(
            doc,
            data,
            Arc::clone(&self.global),
            Arc::clone(&self.diagnostics),
        );
        let shared = Arc::new(Mutex::new(model));
        models.insert(key.to_owned(), Arc::clone(&shared));
        debug!(key, open = models.len(), "opened document");
        shared
    }

    pub async fn get(&self, key: &str) -> Option<SharedModel<D, S>> {
        self.models.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.models.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Forget a document and hand back its parts. `None` if the key is
    /// unknown or someone still holds the model.
    pub async fn close(&self, key: &str) -> Option<(D, S)> {
        let shared = self.models.write().await.remove(key)?;
        match Arc::try_unwrap(shared) {
            Ok(model) => Some(model.into_inner().into_parts()),
            Err(_) => {
                warn!(key, "closed document is still in use elsewhere");
                None
            }
        }
    }
}
