use std::path::Path;

use formdoc_core::parse;

use super::Context;

pub(crate) fn cmd_parse(ctx: &Context, file: &Path, pretty: bool) {
    let text = match std::fs::read_to_string(file) {
        Ok(t) => t,
        Err(e) => ctx.fail(&format!("error reading file '{}': {}", file.display(), e)),
    };
    let conf = match parse(&file.display().to_string(), &text) {
        Ok(c) => c,
        Err(e) => ctx.fail(&format!("error: {}", e)),
    };
    let json = match serde_json::to_value(conf.children()) {
        Ok(v) => v,
        Err(e) => ctx.fail(&format!("serialization error: {}", e)),
    };
    ctx.emit(json, || {
        let lines: Vec<String> = conf
            .children()
            .iter()
            .map(|c| {
                if pretty {
                    c.to_pretty_string()
                } else {
                    c.to_conf_string()
                }
            })
            .collect();
        lines.join("\n")
    });
}
