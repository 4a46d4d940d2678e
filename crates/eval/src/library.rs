//! Named function scopes.
//!
//! A document-local library usually has the process-wide library as its
//! parent. Lookups fall through to the parent, so a local definition
//! overrides a global one of the same name. Mutations only ever touch the
//! local scope.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use formdoc_core::ConfigNode;
use tracing::{debug, error};

use crate::error::FunctionError;
use crate::function::Function;
use crate::values::{Broadcast, ValueProvider};

/// Marker returned instead of a value when a transformation is missing.
pub fn undefined_marker(name: &str) -> String {
    format!("<ERROR: TRAFO '{}' is not defined>", name)
}

#[derive(Debug, Clone, Default)]
pub struct FunctionLibrary {
    functions: BTreeMap<String, Arc<Function>>,
    parent: Option<Arc<FunctionLibrary>>,
    next_auto: u64,
}

impl FunctionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Arc<FunctionLibrary>) -> Self {
        FunctionLibrary {
            parent: Some(parent),
            ..Self::default()
        }
    }

    pub fn parent(&self) -> Option<&Arc<FunctionLibrary>> {
        self.parent.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Function>> {
        match self.functions.get(name) {
            Some(f) => Some(Arc::clone(f)),
            None => self.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Adds or replaces a local definition.
    pub fn add(&mut self, name: impl Into<String>, function: Function) {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Removes a local definition. Parent scopes are never touched.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Function>> {
        self.functions.remove(name)
    }

    /// Parameters of `name`, empty if it is not defined.
    pub fn parameters(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|f| f.parameters().to_vec())
            .unwrap_or_default()
    }

    /// Evaluate `name` against `values`.
    ///
    /// Never fails: an undefined name is logged and yields
    /// [`undefined_marker`] in place of a value.
    pub fn evaluate(&self, name: &str, values: &dyn ValueProvider) -> String {
        match self.get(name) {
            Some(f) => f.eval(values),
            None => {
                error!(trafo = name, "transformation is not defined");
                undefined_marker(name)
            }
        }
    }

    /// Evaluate `name` feeding `value` to every parameter.
    pub fn evaluate_broadcast(&self, name: &str, value: &str) -> String {
        self.evaluate(name, &Broadcast(value))
    }

    /// Names visible from this scope, local and inherited.
    pub fn names(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .parent
            .as_ref()
            .map(|p| p.names())
            .unwrap_or_default();
        out.extend(self.functions.keys().cloned());
        out
    }

    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// A name `prefix` + counter that no visible function uses yet.
    /// The counter only moves forward, so a removed name is not handed out again
    /// by the same library.
    pub fn unique_name(&mut self, prefix: &str) -> String {
        loop {
            self.next_auto += 1;
            let candidate = format!("{}{}", prefix, self.next_auto);
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Parse and add one definition node; its name is the function name.
    pub fn define(&mut self, definition: &ConfigNode) -> Result<(), FunctionError> {
        let f = Function::parse(definition, self)?;
        self.add(definition.name.clone(), f);
        Ok(())
    }

    /// Add every function defined in the `section` sections of `conf`
    /// (e.g. all children of every `Funktionen(...)`).
    ///
    /// Broken definitions are logged and skipped. Returns how many were added.
    pub fn load_sections(&mut self, conf: &ConfigNode, section: &str) -> usize {
        let mut added = 0;
        let sections: Vec<ConfigNode> = conf.query(section).into_iter().cloned().collect();
        for sec in &sections {
            for def in sec.children() {
                match self.define(def) {
                    Ok(()) => added += 1,
                    Err(e) => {
                        error!(function = %def.name, error = %e, "skipping malformed function definition");
                    }
                }
            }
        }
        debug!(section, added, "loaded function definitions");
        added
    }
}
