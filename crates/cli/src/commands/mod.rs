pub(crate) mod edit;
pub(crate) mod eval;
pub(crate) mod inspect;
pub(crate) mod parse;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use formdoc_core::parse;
use formdoc_document::{CollectingSink, DocumentFixture, DocumentModel, MemoryDocument};
use formdoc_eval::FunctionLibrary;
use formdoc_storage::MemoryStore;
use tracing::debug;

use crate::{fail, OutputFormat};

pub(crate) type Model = DocumentModel<MemoryDocument, MemoryStore>;

/// Settings shared by every subcommand.
pub(crate) struct Context {
    pub output: OutputFormat,
    pub quiet: bool,
    pub functions: Arc<FunctionLibrary>,
}

impl Context {
    /// Exits when the global function file cannot be read.
    pub fn new(functions: Option<&Path>, output: OutputFormat, quiet: bool) -> Self {
        let mut library = FunctionLibrary::new();
        if let Some(path) = functions {
            let text = match std::fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => fail(
                    &format!("error reading file '{}': {}", path.display(), e),
                    output,
                    quiet,
                ),
            };
            let conf = match parse(&path.display().to_string(), &text) {
                Ok(c) => c,
                Err(e) => fail(&format!("error: {}", e), output, quiet),
            };
            let loaded = library.load_sections(&conf, "Funktionen");
            debug!(loaded, file = %path.display(), "loaded global functions");
        }
        Context {
            output,
            quiet,
            functions: Arc::new(library),
        }
    }

    pub fn fail(&self, msg: &str) -> ! {
        fail(msg, self.output, self.quiet)
    }

    /// Print a JSON value or, in text mode, the given lines.
    pub fn emit(&self, json: serde_json::Value, text: impl FnOnce() -> String) {
        match self.output {
            OutputFormat::Json => match serde_json::to_string_pretty(&json) {
                Ok(s) => println!("{}", s),
                Err(e) => self.fail(&format!("serialization error: {}", e)),
            },
            OutputFormat::Text => {
                let out = text();
                if !out.is_empty() {
                    println!("{}", out);
                }
            }
        }
    }
}

/// A fixture opened as a document model.
pub(crate) struct OpenDocument {
    pub model: Model,
    sink: Arc<CollectingSink>,
    path: PathBuf,
}

impl OpenDocument {
    /// Read and scan the fixture at `path`; exits on failure.
    pub fn open(ctx: &Context, path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => ctx.fail(&format!("error reading file '{}': {}", path.display(), e)),
        };
        let fixture: DocumentFixture = match serde_json::from_str(&text) {
            Ok(f) => f,
            Err(e) => ctx.fail(&format!("error parsing JSON in '{}': {}", path.display(), e)),
        };
        let (doc, data) = match fixture.into_parts() {
            Ok(parts) => parts,
            Err(e) => ctx.fail(&format!("error loading '{}': {}", path.display(), e)),
        };
        let sink = Arc::new(CollectingSink::new());
        let model = DocumentModel::open(doc, data, Arc::clone(&ctx.functions), sink.clone());
        OpenDocument {
            model,
            sink,
            path: path.to_path_buf(),
        }
    }

    /// Report collected diagnostics and, with `write`, save the document.
    pub fn finish(self, ctx: &Context, write: bool) {
        if !ctx.quiet {
            for d in self.sink.take() {
                eprintln!("warning: {}", d);
            }
        }
        if !write {
            return;
        }
        let (doc, data) = self.model.into_parts();
        let fixture = DocumentFixture::from_parts(&doc, &data);
        let json = match serde_json::to_string_pretty(&fixture) {
            Ok(s) => s,
            Err(e) => ctx.fail(&format!("serialization error: {}", e)),
        };
        if let Err(e) = std::fs::write(&self.path, json + "\n") {
            ctx.fail(&format!("error writing '{}': {}", self.path.display(), e));
        }
        debug!(file = %self.path.display(), "document written");
    }
}
