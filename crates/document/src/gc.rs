//! Collection of generated transformations nobody uses any more.
//!
//! Inserting a transformed field defines a function named
//! `AUTOFUNCTION_<n>` and a user field master bound to it. Once the last
//! field using the function is gone both are dead weight.

use formdoc_storage::PersistentData;
use serde::Serialize;
use tracing::{debug, trace};

use crate::commands::user_field_function;
use crate::host::TextDocument;
use crate::model::DocumentModel;

pub const AUTOFUNCTION_PREFIX: &str = "AUTOFUNCTION_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcSummary {
    /// Removed function names.
    pub functions: Vec<String>,
    /// Disposed user field master names.
    pub masters: Vec<String>,
}

impl GcSummary {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.masters.is_empty()
    }
}

fn is_autofunction(name: &str) -> bool {
    name.starts_with(AUTOFUNCTION_PREFIX)
}

impl<D: TextDocument, S: PersistentData> DocumentModel<D, S> {
    /// Remove autofunctions no registered field uses, from the library and
    /// from the form description, and dispose the user field masters bound
    /// to them. Does not change the document's modified flag.
    pub fn collect_garbage(&mut self) -> GcSummary {
        let modified = self.doc.is_modified();
        let used = self.fields.used_trafos();
        let mut summary = GcSummary::default();

        let dead: Vec<String> = self
            .functions
            .local_names()
            .filter(|n| is_autofunction(n) && !used.contains(*n))
            .map(str::to_owned)
            .collect();
        for name in &dead {
            self.functions.remove(name);
        }
        let removed = self
            .descriptor_mut()
            .remove_functions(|n| is_autofunction(n) && !used.contains(n));
        if !removed.is_empty() {
            self.store_descriptor();
        }
        summary.functions = dead;
        for name in removed {
            if !summary.functions.contains(&name) {
                summary.functions.push(name);
            }
        }

        for master in self.doc.field_masters() {
            let Some(function) = user_field_function(&master) else {
                continue;
            };
            if !is_autofunction(&function) || used.contains(&function) {
                continue;
            }
            match self.doc.dispose_field_master(&master) {
                Ok(()) => summary.masters.push(master),
                Err(e) => trace!(master = %master, error = %e, "field master already gone"),
            }
        }

        self.doc.set_modified(modified);
        if !summary.is_empty() {
            debug!(
                functions = summary.functions.len(),
                masters = summary.masters.len(),
                "collected unused autofunctions"
            );
        }
        summary
    }
}
