use std::collections::BTreeMap;

use serde_json::json;

use super::Context;

pub(crate) fn cmd_eval(ctx: &Context, name: &str, values: &[String], broadcast: Option<&str>) {
    let library = &ctx.functions;
    if !library.contains(name) {
        ctx.fail(&format!("error: function '{}' is not defined", name));
    }

    let result = match broadcast {
        Some(v) => library.evaluate_broadcast(name, v),
        None => {
            let mut known = BTreeMap::new();
            for pair in values {
                let Some((id, v)) = pair.split_once('=') else {
                    ctx.fail(&format!("error: expected ID=VALUE, got '{}'", pair));
                };
                known.insert(id.to_owned(), v.to_owned());
            }
            library.evaluate(name, &known)
        }
    };
    let params = library.parameters(name);
    ctx.emit(
        json!({ "name": name, "parameters": params, "result": result }),
        || result.clone(),
    );
}
