//! Document model behaviour over in-memory documents.

use std::collections::BTreeSet;
use std::sync::Arc;

use formdoc_core::parse_single;
use formdoc_document::host::set_anchor_text;
use formdoc_document::{
    parse_pattern, CollectingSink, DocumentFixture, DocumentModel, MemoryDocument, Span,
    SubstitutionPart, TextDocument, FISHY,
};
use formdoc_eval::FunctionLibrary;
use formdoc_storage::{DataId, MemoryStore, PersistentData};
use serde_json::json;

type Model = DocumentModel<MemoryDocument, MemoryStore>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn open(fixture: serde_json::Value) -> (Model, Arc<CollectingSink>) {
    init_tracing();
    let fixture: DocumentFixture = serde_json::from_value(fixture).unwrap();
    let (doc, data) = fixture.into_parts().unwrap();
    let sink = Arc::new(CollectingSink::new());
    let model = DocumentModel::open(doc, data, Arc::new(FunctionLibrary::new()), sink.clone());
    (model, sink)
}

fn blob(model: &Model, id: DataId) -> Option<String> {
    model.data().get(id).unwrap()
}

const NACHNAME: &str = "WM(CMD 'insertFormValue' ID 'Nachname')";

// ──────────────────────────────────────────────
// Values and rendering
// ──────────────────────────────────────────────

#[test]
fn meier_end_to_end() {
    let (mut model, sink) = open(json!({
        "content": [
            {"text": "Sehr geehrte Frau "},
            {"bookmark": {"name": NACHNAME, "content": []}},
            {"text": ","}
        ],
        "data": {"WollMuxFormularwerte": "WM(Formularwerte((ID 'Nachname' VALUE 'Meier')))"}
    }));
    assert!(model.fields().contains_id("Nachname"));

    model.update_all_fields();
    assert_eq!(model.doc().text(), "Sehr geehrte Frau Meier,");
    assert!(model.doc().is_modified());

    model.set_value("Nachname", Some("Müller"));
    model.update_fields("Nachname");
    assert_eq!(model.doc().text(), "Sehr geehrte Frau Müller,");
    assert_eq!(
        blob(&model, DataId::FormValues).as_deref(),
        Some("WM(Formularwerte((ID 'Nachname' VALUE 'Müller')))")
    );
    assert_eq!(model.preset_value("Nachname").as_deref(), Some("Müller"));

    set_anchor_text(model.doc_mut(), NACHNAME, "Schulz").unwrap();
    assert_eq!(model.preset_value("Nachname").as_deref(), Some("Schulz"));

    model.set_value("Nachname", Some("Schulz"));
    model.set_preview_mode(false);
    assert_eq!(model.doc().text(), "Sehr geehrte Frau <Nachname>,");
    assert_eq!(model.preset_value("Nachname").as_deref(), Some("Schulz"));

    model.set_preview_mode(true);
    assert_eq!(model.doc().text(), "Sehr geehrte Frau Schulz,");
    assert!(sink.is_empty());
}

#[test]
fn removing_a_value_still_persists_the_store() {
    let (mut model, _) = open(json!({
        "data": {"WollMuxFormularwerte": "WM(Formularwerte((ID 'A' VALUE 'a') (ID 'B' VALUE 'b')))"}
    }));
    model.set_value("A", None);
    assert_eq!(
        blob(&model, DataId::FormValues).as_deref(),
        Some("WM(Formularwerte((ID 'B' VALUE 'b')))")
    );
    assert_eq!(model.values().get("A"), None);
}

#[test]
fn command_fields_broadcast_in_preview_mode() {
    let (mut model, _) = open(json!({
        "content": [
            {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'A' TRAFO 'Gross')", "content": []}}
        ],
        "data": {
            "WollMuxFormularbeschreibung": "WM(Formular(Funktionen(Gross(CAT(VALUE 'x' '!')))))",
            "WollMuxFormularwerte": "WM(Formularwerte((ID 'A' VALUE 'a')))"
        }
    }));
    model.update_all_fields();
    assert_eq!(model.doc().text(), "a!");
    assert_eq!(model.transformed_value("z", Some("Gross"), false), "z!");
    assert_eq!(model.transformed_value("z", None, true), "z");
}

// ──────────────────────────────────────────────
// Preset values
// ──────────────────────────────────────────────

fn preset_fixture() -> serde_json::Value {
    json!({
        "content": [
            {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'A')", "content": [{"text": "a"}]}},
            {"text": " / "},
            {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'A' TRAFO 'Gross')", "content": [{"text": "a!"}]}},
            {"text": " / "},
            {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'B')", "content": [{"text": "b"}]}},
            {"text": " / "},
            {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'B') 2", "content": [{"text": "b"}]}}
        ],
        "data": {
            "WollMuxFormularbeschreibung": "WM(Formular(Funktionen(Gross(CAT(VALUE 'x' '!')))))",
            "WollMuxFormularwerte": "WM(Formularwerte((ID 'A' VALUE 'a') (ID 'B' VALUE 'b') (ID 'C' VALUE 'c')))"
        }
    })
}

#[test]
fn untouched_fields_keep_the_stored_value() {
    let (model, _) = open(preset_fixture());
    let presets = model.preset_values();
    assert_eq!(presets["A"], "a");
    assert_eq!(presets["B"], "b");
    assert_eq!(presets["C"], "c");
    assert_eq!(model.preset_value("unknown"), None);
}

#[test]
fn edits_next_to_a_transformed_field_are_fishy() {
    let (mut model, _) = open(preset_fixture());
    set_anchor_text(model.doc_mut(), "WM(CMD 'insertFormValue' ID 'A')", "x").unwrap();
    assert_eq!(model.preset_value("A").as_deref(), Some(FISHY));
}

#[test]
fn agreeing_edits_are_adopted() {
    let (mut model, _) = open(preset_fixture());
    set_anchor_text(model.doc_mut(), "WM(CMD 'insertFormValue' ID 'B') 2", "x").unwrap();
    assert_eq!(model.preset_value("B").as_deref(), Some("x"));

    set_anchor_text(model.doc_mut(), "WM(CMD 'insertFormValue' ID 'B')", "x").unwrap();
    assert_eq!(model.preset_value("B").as_deref(), Some("x"));

    set_anchor_text(model.doc_mut(), "WM(CMD 'insertFormValue' ID 'B')", "y").unwrap();
    assert_eq!(model.preset_value("B").as_deref(), Some(FISHY));
}

#[test]
fn edited_native_field_is_adopted() {
    let (mut model, _) = open(json!({
        "content": [
            {"bookmark": {"name": NACHNAME, "content": [{"text": "Muster"}]}},
            {"text": " / "},
            {"field": {"kind": {"database": "Nachname"}, "content": "Muster"}}
        ],
        "data": {"WollMuxFormularwerte": "WM(Formularwerte((ID 'Nachname' VALUE 'Muster')))"}
    }));
    assert_eq!(model.fields().command_fields("Nachname").len(), 1);
    assert_eq!(model.fields().native_fields("Nachname").len(), 1);
    assert_eq!(model.preset_values()["Nachname"], "Muster");

    let field = model.doc().text_fields()[0].id;
    model.doc_mut().set_text_field_content(field, "Meier").unwrap();
    assert_eq!(model.preset_value("Nachname").as_deref(), Some("Meier"));
}

#[test]
fn vanished_transformed_fields_do_not_make_edits_fishy() {
    let (mut model, _) = open(preset_fixture());
    model
        .doc_mut()
        .remove_anchor("WM(CMD 'insertFormValue' ID 'A' TRAFO 'Gross')")
        .unwrap();
    set_anchor_text(model.doc_mut(), "WM(CMD 'insertFormValue' ID 'A')", "x").unwrap();
    assert_eq!(model.preset_value("A").as_deref(), Some("x"));
}

#[test]
fn vanished_fields_are_ignored() {
    let (mut model, _) = open(preset_fixture());
    set_anchor_text(model.doc_mut(), "WM(CMD 'insertFormValue' ID 'B')", "x").unwrap();
    model
        .doc_mut()
        .remove_anchor("WM(CMD 'insertFormValue' ID 'B')")
        .unwrap();
    assert_eq!(model.preset_value("B").as_deref(), Some("b"));
}

// ──────────────────────────────────────────────
// Commands executed on scan
// ──────────────────────────────────────────────

#[test]
fn scan_executes_one_shot_commands() {
    let (model, sink) = open(json!({
        "content": [
            {"bookmark": {"name": "WM(CMD 'form')", "content": [
                {"text": "WM(Formular(Funktionen(Gross(CAT(VALUE 'x' '!')))))"}
            ]}},
            {"bookmark": {"name": "WM(CMD 'setType' TYPE 'formDocument')", "content": []}},
            {"bookmark": {"name": "WM(CMD 'setPrintFunction' FUNCTION 'Briefkopf')", "content": []}},
            {"text": "x"},
            {"bookmark": {"name": "WM(CMD 'overrideFrag' FRAG_ID 'A' NEW_FRAG_ID 'B')", "content": []}},
            {"text": "y"},
            {"bookmark": {"name": "WM(CMD 'overrideFrag' FRAG_ID 'B' NEW_FRAG_ID 'C')", "content": []}}
        ]
    }));

    assert_eq!(model.doc().text(), "xy");
    assert!(model.functions().contains("Gross"));
    assert!(blob(&model, DataId::FormDescription).is_some());
    assert!(model.is_form_document());
    assert!(model.print_functions().contains("Briefkopf"));
    assert_eq!(blob(&model, DataId::PrintFunction).as_deref(), Some("Briefkopf"));
    assert_eq!(model.override_frag("A"), "B");
    assert_eq!(model.override_frag("B"), "B");
    assert_eq!(sink.len(), 1);

    let names: Vec<String> = model.doc().anchors().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["WM(CMD 'setType' TYPE 'formDocument')".to_string()]);
    assert_eq!(model.commands().len(), 1);
}

#[test]
fn executed_commands_do_not_run_again_on_reopen() {
    let (mut model, sink) = open(json!({
        "content": [
            {"bookmark": {"name": "WM(CMD 'form')", "content": [
                {"text": "WM(Formular(Funktionen(Gross(CAT(VALUE 'x' '!')))))"}
            ]}},
            {"bookmark": {"name": "WM(CMD 'setPrintFunction' FUNCTION 'Briefkopf')", "content": []}},
            {"text": "Text"}
        ]
    }));
    assert!(sink.is_empty());
    assert!(model.print_functions().contains("Briefkopf"));
    assert!(model.doc().anchors().is_empty());
    model.remove_print_function("Briefkopf");

    let (doc, data) = model.into_parts();
    let sink = Arc::new(CollectingSink::new());
    let model = DocumentModel::open(doc, data, Arc::new(FunctionLibrary::new()), sink.clone());
    assert!(model.print_functions().is_empty());
    assert_eq!(blob(&model, DataId::PrintFunction), None);
    assert!(model.functions().contains("Gross"));
    assert_eq!(model.doc().text(), "Text");
    assert!(sink.is_empty());
}

#[test]
fn override_frags_reject_chains() {
    let (mut model, _) = open(json!({}));
    model.set_override_frag("A", "B").unwrap();
    model.set_override_frag("A", "Z").unwrap();
    assert_eq!(model.override_frag("A"), "B");
    assert!(model.set_override_frag("X", "A").is_err());
    assert!(model.set_override_frag("B", "C").is_err());
    model.set_override_frag("D", "").unwrap();
    assert_eq!(model.override_frag("D"), "");
}

#[test]
fn group_visibility_follows_invisible_groups() {
    let anchor = "WM(CMD 'setGroups' GROUPS('G1' 'G2'))";
    let (mut model, _) = open(json!({
        "content": [{"bookmark": {"name": anchor, "content": [{"text": "Absatz"}]}}]
    }));
    model.set_visible_state("G2", false);
    assert_eq!(model.doc().anchor_visible(anchor), Some(false));
    model.set_visible_state("G1", true);
    assert_eq!(model.doc().anchor_visible(anchor), Some(false));
    model.set_visible_state("G2", true);
    assert_eq!(model.doc().anchor_visible(anchor), Some(true));
}

// ──────────────────────────────────────────────
// Transformations and garbage collection
// ──────────────────────────────────────────────

#[test]
fn trafo_field_round_trip_and_collection() {
    let (mut model, _) = open(json!({
        "content": [{"text": "Betreff: X."}],
        "data": {"WollMuxFormularwerte": "WM(Formularwerte((ID 'Vorname' VALUE 'Erika')))"}
    }));
    let conf = parse_single("t", "Trafo(CAT(VALUE 'Vorname' ' ' VALUE 'Nachname'))").unwrap();
    let name = model.insert_trafo_field(Span::new(9, 10), &conf).unwrap();
    assert_eq!(name, "AUTOFUNCTION_1");
    assert_eq!(model.doc().text(), "Betreff: Erika .");
    assert_eq!(model.values().get("Nachname"), Some(""));
    assert!(model.trafo_definition(&name).is_some());
    assert!(blob(&model, DataId::FormDescription).is_some());
    assert_eq!(model.fields().native_fields("Vorname").len(), 1);

    model.set_value("Nachname", Some("Muster"));
    model.update_fields("Nachname");
    assert_eq!(model.doc().text(), "Betreff: Erika Muster.");

    let field = model.doc().text_fields()[0].id;
    model.doc_mut().remove_text_field(field).unwrap();
    model.scan();
    model.doc_mut().set_modified(false);

    let summary = model.collect_garbage();
    assert_eq!(summary.functions, vec![name.clone()]);
    assert_eq!(summary.masters, vec![format!("WM(FUNCTION '{}')", name)]);
    assert!(!model.doc().is_modified());
    assert!(!model.functions().contains(&name));
    assert_eq!(blob(&model, DataId::FormDescription), None);
    assert!(model.collect_garbage().is_empty());
}

#[test]
fn set_trafo_needs_a_document_local_definition() {
    let (mut model, _) = open(json!({
        "content": [
            {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'A' TRAFO 'Gross')", "content": []}}
        ],
        "data": {
            "WollMuxFormularbeschreibung": "WM(Formular(Funktionen(Gross(CAT(VALUE 'x' '!')))))",
            "WollMuxFormularwerte": "WM(Formularwerte((ID 'A' VALUE 'a')))"
        }
    }));
    let conf = parse_single("t", "Neu(CAT('<' VALUE 'x' '>'))").unwrap();
    assert!(model.set_trafo("Fehlt", &conf).is_err());

    model.set_trafo("Gross", &conf).unwrap();
    assert_eq!(model.doc().text(), "<a>");
    let stored = blob(&model, DataId::FormDescription).unwrap();
    assert!(stored.contains("Gross(CAT('<' VALUE 'x' '>'))"), "{stored}");
}

#[test]
fn empty_form_description_is_not_persisted() {
    let (mut model, _) = open(json!({
        "data": {"WollMuxFormularbeschreibung": "WM(Formular(TITLE 'Brief' Fenster(Tab(TITLE 'x'))))"}
    }));
    assert!(model.form_description().is_meaningful());
    let empty = parse_single("t", "WM(Formular(TITLE 'Brief'))").unwrap();
    model.set_form_description(Some(empty));
    assert_eq!(blob(&model, DataId::FormDescription), None);
}

// ──────────────────────────────────────────────
// Substitution
// ──────────────────────────────────────────────

#[test]
fn plain_field_is_split_into_new_fields() {
    let (mut model, sink) = open(json!({
        "content": [
            {"text": "An "},
            {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'Name')", "content": [{"text": "Erika Muster"}]}},
            {"text": "."}
        ],
        "data": {"WollMuxFormularwerte":
            "WM(Formularwerte((ID 'Name' VALUE 'Erika Muster') (ID 'Vorname' VALUE 'Erika') (ID 'Nachname' VALUE 'Muster')))"}
    }));
    let summary = model.substitute("Name", &parse_pattern("<Vorname> <Nachname>"));
    assert_eq!(summary.replaced, 1);
    assert_eq!(summary.rejected, 0);
    assert_eq!(model.doc().text(), "An Erika Muster.");
    assert!(!model.fields().contains_id("Name"));
    assert_eq!(model.fields().command_fields("Vorname").len(), 1);
    assert_eq!(model.fields().command_fields("Nachname").len(), 1);
    assert_eq!(model.values().get("Name"), None);
    assert!(sink.is_empty());

    assert_eq!(model.substitute("Vorname", &[]), Default::default());
}

#[test]
fn empty_plain_field_is_replaced_in_place() {
    let (mut model, sink) = open(json!({
        "content": [
            {"text": "A"},
            {"bookmark": {"name": "WM(CMD 'insertFormValue' ID 'Name')", "content": []}},
            {"text": "B"}
        ],
        "data": {"WollMuxFormularwerte":
            "WM(Formularwerte((ID 'Vorname' VALUE 'Erika') (ID 'Nachname' VALUE 'Muster')))"}
    }));
    let summary = model.substitute("Name", &parse_pattern("<Vorname>-<Nachname>"));
    assert_eq!(summary.replaced, 1);
    assert!(sink.is_empty());
    assert_eq!(model.doc().text(), "AErika-MusterB");
    let names: Vec<String> = model.doc().anchors().into_iter().map(|a| a.name).collect();
    assert_eq!(
        names,
        vec![
            "WM(CMD 'insertFormValue' ID 'Vorname')".to_string(),
            "WM(CMD 'insertFormValue' ID 'Nachname')".to_string(),
        ]
    );
}

fn user_field_fixture() -> serde_json::Value {
    json!({
        "content": [
            {"field": {"kind": {"user": "WM(FUNCTION 'Gruss')"}, "content": "Hallo Welt"}}
        ],
        "masters": ["WM(FUNCTION 'Gruss')"],
        "data": {
            "WollMuxFormularbeschreibung": "WM(Formular(Funktionen(Gruss(CAT('Hallo ' VALUE 'F')))))",
            "WollMuxFormularwerte": "WM(Formularwerte((ID 'F' VALUE 'Welt')))"
        }
    })
}

#[test]
fn transformed_field_is_renamed_one_to_one() {
    let (mut model, sink) = open(user_field_fixture());
    assert_eq!(model.fields().native_fields("F").len(), 1);

    let summary = model.substitute("F", &[SubstitutionPart::Field("G".into())]);
    assert_eq!(summary.renamed, 1);
    assert!(sink.is_empty());
    assert_eq!(model.fields().native_fields("G").len(), 1);
    assert!(!model.fields().contains_id("F"));
    assert_eq!(model.values().get("F"), None);
    let def = model.trafo_definition("Gruss").unwrap();
    assert_eq!(def.to_conf_string(), "Gruss(CAT('Hallo ' VALUE 'G'))");
    assert_eq!(model.doc().text(), "Hallo ");
}

#[test]
fn transformed_field_rejects_a_split() {
    let (mut model, sink) = open(user_field_fixture());
    let summary = model.substitute("F", &parse_pattern("<G> <H>"));
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.replaced, 0);
    assert_eq!(sink.len(), 1);
    assert_eq!(model.fields().native_fields("F").len(), 1);
    assert_eq!(model.values().get("F"), None);
    assert_eq!(model.doc().text(), "Hallo Welt");

    let def = model.trafo_definition("Gruss").unwrap();
    assert_eq!(def.to_conf_string(), "Gruss(CAT('Hallo ' VALUE 'F'))");
    assert_eq!(model.functions().parameters("Gruss"), vec!["F".to_string()]);
}

#[test]
fn transformed_field_rejects_text_around_one_field() {
    let (mut model, sink) = open(user_field_fixture());
    let parts = [
        SubstitutionPart::FixedText("a".into()),
        SubstitutionPart::Field("Y".into()),
    ];
    let summary = model.substitute("F", &parts);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.renamed, 0);
    assert_eq!(sink.len(), 1);
    assert_eq!(model.functions().parameters("Gruss"), vec!["F".to_string()]);
    assert_eq!(
        blob(&model, DataId::FormDescription).as_deref(),
        Some("WM(Formular(Funktionen(Gruss(CAT('Hallo ' VALUE 'F')))))")
    );
}

// ──────────────────────────────────────────────
// Mail merge, reporting and cleanup
// ──────────────────────────────────────────────

#[test]
fn mail_merge_fields_and_schema_report() {
    let (mut model, _) = open(json!({
        "content": [{"text": "Hallo !"}],
        "data": {"WollMuxFormularwerte": "WM(Formularwerte((ID 'Vorname' VALUE 'Erika')))"}
    }));
    assert!(!model.has_mail_merge_fields());
    model.insert_mail_merge_field("Vorname", Span::at(6)).unwrap();
    model.insert_mail_merge_field("Ort", Span::at(0)).unwrap();
    assert_eq!(model.doc().text(), "Hallo Erika!");
    assert_eq!(model.values().get("Ort"), Some(""));
    assert!(model.has_mail_merge_fields());

    let schema: BTreeSet<String> = ["Vorname".to_string()].into();
    let missing = model.referenced_field_ids_not_in_schema(&schema);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].id, "Ort");
    assert!(!missing[0].transformed);
}

#[test]
fn mailmerge_config_round_trip() {
    let (mut model, _) = open(json!({}));
    assert_eq!(model.mailmerge_config().count(), 0);
    let conf = parse_single("t", "Seriendruck(DATENQUELLE 'adressen')").unwrap();
    model.set_mailmerge_config(&conf);
    assert_eq!(
        blob(&model, DataId::MailMerge).as_deref(),
        Some("WM(Seriendruck(DATENQUELLE 'adressen'))")
    );
    assert_eq!(
        model.mailmerge_config().get_str("DATENQUELLE").as_deref(),
        Some("adressen")
    );
    model.set_mailmerge_config(&parse_single("t", "Seriendruck()").unwrap());
    assert_eq!(blob(&model, DataId::MailMerge), None);
}

#[test]
fn type_and_print_functions_persist() {
    let (mut model, _) = open(json!({}));
    assert!(!model.is_form_document());
    model.set_type(Some("FormDocument"));
    assert!(model.is_form_document());
    assert_eq!(blob(&model, DataId::SetType).as_deref(), Some("FormDocument"));
    model.set_type(None);
    assert_eq!(blob(&model, DataId::SetType), None);

    model.add_print_function("B");
    model.add_print_function("A");
    assert_eq!(
        blob(&model, DataId::PrintFunction).as_deref(),
        Some("WM(Druckfunktionen((FUNCTION 'A') (FUNCTION 'B')))")
    );
    model.remove_print_function("A");
    model.remove_print_function("B");
    assert_eq!(blob(&model, DataId::PrintFunction), None);
}

#[test]
fn de_form_strips_form_commands_and_data() {
    let (mut model, _) = open(json!({
        "content": [
            {"bookmark": {"name": NACHNAME, "content": [{"text": "Meier"}]}},
            {"bookmark": {"name": "Textmarke1", "content": [{"text": "!"}]}}
        ],
        "data": {"WollMuxFormularwerte": "WM(Formularwerte((ID 'Nachname' VALUE 'Meier')))"}
    }));
    model.de_form();
    let names: Vec<String> = model.doc().anchors().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["Textmarke1".to_string()]);
    assert_eq!(model.doc().text(), "Meier!");
    assert_eq!(blob(&model, DataId::FormValues), None);
    assert!(model.fields().all_ids().is_empty());

    assert_eq!(model.remove_non_wm_bookmarks(), 1);
    assert!(model.doc().anchors().is_empty());
}

#[test]
fn focus_prefers_native_fields() {
    let (mut model, _) = open(json!({
        "content": [
            {"bookmark": {"name": NACHNAME, "content": []}},
            {"field": {"kind": {"database": "Nachname"}, "content": ""}}
        ]
    }));
    model.focus_form_field("Nachname");
    let field = model.doc().text_fields()[0].id;
    assert_eq!(
        model.doc().focused(),
        Some(&formdoc_document::host::FocusTarget::TextField(field))
    );
}
