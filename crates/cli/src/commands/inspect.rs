use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use serde_json::json;

use super::{Context, OpenDocument};

pub(crate) fn cmd_commands(ctx: &Context, path: &Path) {
    let doc = OpenDocument::open(ctx, path);
    let tree = doc.model.commands();
    let rows: Vec<_> = tree
        .outline()
        .into_iter()
        .filter_map(|(depth, id)| tree.get(id).map(|c| (depth, c)))
        .collect();

    let json = json!(rows
        .iter()
        .map(|(depth, c)| json!({
            "anchor": c.anchor,
            "kind": c.kind.label(),
            "depth": depth,
            "visible": c.is_visible(),
        }))
        .collect::<Vec<_>>());
    ctx.emit(json, || {
        rows.iter()
            .map(|(depth, c)| {
                let mut line = format!("{}{}  {}", "  ".repeat(*depth), c.kind.label(), c.anchor);
                if !c.is_visible() {
                    line.push_str("  [hidden]");
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    });
    doc.finish(ctx, false);
}

pub(crate) fn cmd_fields(ctx: &Context, path: &Path, schema: Option<&str>) {
    let doc = OpenDocument::open(ctx, path);
    let model = &doc.model;

    if let Some(schema) = schema {
        let schema: BTreeSet<String> = schema
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        let missing = model.referenced_field_ids_not_in_schema(&schema);
        let json = json!(missing);
        ctx.emit(json, || {
            missing
                .iter()
                .map(|r| {
                    if r.transformed {
                        format!("{}  (transformed)", r.id)
                    } else {
                        r.id.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        });
        doc.finish(ctx, false);
        return;
    }

    let fields = model.fields();
    let rows: Vec<FieldRow> = fields
        .all_ids()
        .into_iter()
        .map(|id| FieldRow {
            command: fields.command_fields(&id).len(),
            native: fields.native_fields(&id).len(),
            transformed: fields.handles_for(&id).iter().any(|h| h.is_transformed()),
            value: model.values().get(&id).map(str::to_owned),
            id,
        })
        .collect();
    let static_fields = fields.static_fields().len();
    let json = json!({ "fields": rows, "static": static_fields });
    ctx.emit(json, || {
        let mut lines: Vec<String> = rows
            .iter()
            .map(|r| {
                format!(
                    "{}  command={} native={}{}  value={}",
                    r.id,
                    r.command,
                    r.native,
                    if r.transformed { " transformed" } else { "" },
                    r.value.as_deref().unwrap_or("-"),
                )
            })
            .collect();
        if static_fields > 0 {
            lines.push(format!("({} static)", static_fields));
        }
        lines.join("\n")
    });
    doc.finish(ctx, false);
}

#[derive(Serialize)]
struct FieldRow {
    id: String,
    command: usize,
    native: usize,
    transformed: bool,
    value: Option<String>,
}

pub(crate) fn cmd_preset(ctx: &Context, path: &Path) {
    let doc = OpenDocument::open(ctx, path);
    let presets = doc.model.preset_values();
    ctx.emit(json!(presets), || {
        presets
            .iter()
            .map(|(id, v)| format!("{}={}", id, v))
            .collect::<Vec<_>>()
            .join("\n")
    });
    doc.finish(ctx, false);
}
