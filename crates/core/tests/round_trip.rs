//! Every node parsed from valid text must survive serialize-then-parse
//! unchanged, in both the compact and the indented writer.

use formdoc_core::{parse, ConfigNode};

const SAMPLES: &[&str] = &[
    "WM(CMD 'insertFormValue' ID 'Nachname')",
    "WM(CMD 'insertFormValue' ID 'Anrede' TRAFO 'AUTOFUNCTION_1')",
    "WM(CMD 'setGroups' GROUPS('Empfaenger' 'Kopie'))",
    "WM(CMD 'draftOnly' HIGHLIGHT_COLOR 'ffff00')",
    "WM(Druckfunktionen((FUNCTION 'Serienbrief') (FUNCTION 'Sachleitende' ARG 'x')))",
    "WM(Formularwerte((ID 'Nachname' VALUE 'Muster') (ID 'Vorname' VALUE 'it''s 50%%')))",
    r#"WM(Formular(
        TITLE 'Antrag'
        Fenster(Angaben(TITLE 'Angaben' Eingabefelder((ID 'Nachname' LABEL 'Name' TYPE 'textfield'))))
        Sichtbarkeit(Kopie(VALUE 'Kopie'))
        Funktionen(
            Gross(CAT(VALUE 'Vorname' ' ' VALUE 'Nachname'))
            AUTOFUNCTION_7(IF(STRCMP(VALUE 'Anrede' 'Herr') THEN 'Sehr geehrter Herr' ELSE 'Sehr geehrte Frau'))
        )
    ))"#,
    "('') (('nested' 'anonymous'))",
    "Seriendruck(Datenquelle(TYPE 'calc' URL 'file:///tmp/x.ods' TABLE 'Tabelle1'))",
];

fn check(node: &ConfigNode) {
    for text in [node.to_conf_string(), node.to_pretty_string()] {
        let back = parse("round-trip", &text)
            .unwrap_or_else(|e| panic!("reparse failed for {text}: {e}"));
        assert_eq!(back.children().len(), 1, "{text}");
        assert_eq!(&back.children()[0], node, "{text}");
    }
}

#[test]
fn samples_round_trip() {
    for src in SAMPLES {
        let root = parse("sample", src).unwrap();
        assert!(!root.children().is_empty(), "{src}");
        for child in root.children() {
            check(child);
        }
    }
}

#[test]
fn programmatic_trees_round_trip() {
    let mut wm = ConfigNode::new("WM");
    let values = wm.add(ConfigNode::new("Formularwerte"));
    for (id, value) in [("A", "line1\nline2"), ("B", ""), ("C", "'quoted'")] {
        values.add(ConfigNode::with_children(
            "",
            vec![ConfigNode::pair("ID", id), ConfigNode::pair("VALUE", value)],
        ));
    }
    check(&wm);
}

#[test]
fn serde_json_shape_is_name_and_children() {
    let root = parse("j", "A(B 'x')").unwrap();
    let json = serde_json::to_value(&root.children()[0]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"name": "A", "children": [{"name": "B", "children": [{"name": "x"}]}]})
    );
}
