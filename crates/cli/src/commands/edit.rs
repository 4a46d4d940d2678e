use std::path::Path;

use formdoc_document::parse_pattern;
use serde_json::json;

use super::{Context, OpenDocument};

pub(crate) fn cmd_set(ctx: &Context, path: &Path, id: &str, value: Option<&str>, write: bool) {
    let mut doc = OpenDocument::open(ctx, path);
    doc.model.set_value(id, value);
    doc.model.update_fields(id);
    let text = doc.model.doc().text();
    ctx.emit(json!({ "id": id, "value": value, "text": text }), || text.clone());
    doc.finish(ctx, write);
}

pub(crate) fn cmd_substitute(ctx: &Context, path: &Path, id: &str, pattern: &str, write: bool) {
    let parts = parse_pattern(pattern);
    if parts.is_empty() {
        ctx.fail("error: --with must not be empty");
    }
    let mut doc = OpenDocument::open(ctx, path);
    let summary = doc.model.substitute(id, &parts);
    let text = doc.model.doc().text();
    ctx.emit(json!({ "summary": summary, "text": text }), || {
        format!(
            "replaced {}, renamed {}, rejected {}\n{}",
            summary.replaced, summary.renamed, summary.rejected, text
        )
    });
    doc.finish(ctx, write);
}

pub(crate) fn cmd_gc(ctx: &Context, path: &Path, write: bool) {
    let mut doc = OpenDocument::open(ctx, path);
    let summary = doc.model.collect_garbage();
    ctx.emit(json!(summary), || {
        if summary.is_empty() {
            if ctx.quiet {
                String::new()
            } else {
                "nothing to collect".to_owned()
            }
        } else {
            summary
                .functions
                .iter()
                .map(|f| format!("removed function {}", f))
                .chain(summary.masters.iter().map(|m| format!("removed master {}", m)))
                .collect::<Vec<_>>()
                .join("\n")
        }
    });
    doc.finish(ctx, write);
}
