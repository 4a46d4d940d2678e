//! Print function names attached to a document.
//!
//! Two blob syntaxes exist: a bare identifier, and
//! `WM(Druckfunktionen((FUNCTION 'name') ...))`. Older writers always used
//! the structured form, so its presence says nothing about how many
//! functions are set.

use std::collections::BTreeSet;

use formdoc_core::{identifier, parse, ConfigError, ConfigNode};
use tracing::error;

/// Parse a print-function blob. Unreadable blobs are logged and yield no
/// functions.
pub fn parse_print_functions(blob: &str) -> BTreeSet<String> {
    if blob.is_empty() {
        return BTreeSet::new();
    }
    let structured = parse("Druckfunktionen", blob).and_then(|conf| structured_names(&conf));
    match structured {
        Ok(names) => names,
        Err(e) => match identifier(blob) {
            Ok(name) => BTreeSet::from([name.to_owned()]),
            Err(_) => {
                error!(blob, error = %e, "print function blob is malformed");
                BTreeSet::new()
            }
        },
    }
}

fn structured_names(conf: &ConfigNode) -> Result<BTreeSet<String>, ConfigError> {
    let section = conf.get("WM")?.get("Druckfunktionen")?;
    Ok(section
        .children()
        .iter()
        .filter_map(|entry| entry.child("FUNCTION").map(ConfigNode::value))
        .collect())
}

/// The blob for `functions`, `None` when there are none.
pub fn print_functions_blob(functions: &BTreeSet<String>) -> Option<String> {
    match functions.len() {
        0 => None,
        1 => functions.iter().next().cloned(),
        _ => {
            let mut section = ConfigNode::new("Druckfunktionen");
            for name in functions {
                section.add(ConfigNode::with_children(
                    "",
                    vec![ConfigNode::pair("FUNCTION", name)],
                ));
            }
            Some(ConfigNode::with_children("WM", vec![section]).to_conf_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn bare_and_structured_forms_are_read() {
        let bare = parse_print_functions("SachleitendeVerfuegung");
        assert_eq!(names(&bare), vec!["SachleitendeVerfuegung"]);
        let structured = parse_print_functions(
            "WM(Druckfunktionen((FUNCTION 'B') (FUNCTION 'A')))",
        );
        assert_eq!(names(&structured), vec!["A", "B"]);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_print_functions("").is_empty());
        assert!(parse_print_functions("1abc(").is_empty());
        assert!(parse_print_functions("Anderes('x')").is_empty());
    }

    #[test]
    fn writer_prefers_the_bare_form() {
        let mut set = BTreeSet::new();
        assert_eq!(print_functions_blob(&set), None);
        set.insert("Zweite".to_string());
        assert_eq!(print_functions_blob(&set).as_deref(), Some("Zweite"));
        set.insert("Erste".to_string());
        let blob = print_functions_blob(&set).unwrap();
        assert_eq!(
            blob,
            "WM(Druckfunktionen((FUNCTION 'Erste') (FUNCTION 'Zweite')))"
        );
        assert_eq!(parse_print_functions(&blob), set);
    }
}
