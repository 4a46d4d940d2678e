use super::{expect_blob, TestResult};
use crate::{DataId, PersistentData};

pub(super) fn run_blob_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: PersistentData,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "blobs",
            "fresh_store_is_empty",
            fresh_store_is_empty(factory),
        ),
        TestResult::from_result(
            "blobs",
            "set_then_get_returns_blob",
            set_then_get_returns_blob(factory),
        ),
        TestResult::from_result(
            "blobs",
            "set_replaces_previous_blob",
            set_replaces_previous_blob(factory),
        ),
        TestResult::from_result(
            "blobs",
            "remove_makes_blob_absent",
            remove_makes_blob_absent(factory),
        ),
        TestResult::from_result(
            "blobs",
            "remove_of_absent_id_is_ok",
            remove_of_absent_id_is_ok(factory),
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

fn fresh_store_is_empty<S, F>(factory: &F) -> Result<(), String>
where
    S: PersistentData,
    F: Fn() -> S,
{
    let s = factory();
    for id in DataId::ALL {
        expect_blob(&s, id, None)?;
    }
    let ids = s.ids().map_err(|e| e.to_string())?;
    if !ids.is_empty() {
        return Err(format!("expected no ids, got {:?}", ids));
    }
    Ok(())
}

fn set_then_get_returns_blob<S, F>(factory: &F) -> Result<(), String>
where
    S: PersistentData,
    F: Fn() -> S,
{
    let mut s = factory();
    let blob = "WM(Formularwerte((ID 'Nachname' VALUE 'Muster')))";
    s.set(DataId::FormValues, blob).map_err(|e| e.to_string())?;
    expect_blob(&s, DataId::FormValues, Some(blob))
}

fn set_replaces_previous_blob<S, F>(factory: &F) -> Result<(), String>
where
    S: PersistentData,
    F: Fn() -> S,
{
    let mut s = factory();
    s.set(DataId::SetType, "templateTemplate")
        .map_err(|e| e.to_string())?;
    s.set(DataId::SetType, "formDocument")
        .map_err(|e| e.to_string())?;
    expect_blob(&s, DataId::SetType, Some("formDocument"))
}

fn remove_makes_blob_absent<S, F>(factory: &F) -> Result<(), String>
where
    S: PersistentData,
    F: Fn() -> S,
{
    let mut s = factory();
    s.set(DataId::FormDescription, "WM(Formular(TITLE 'x'))")
        .map_err(|e| e.to_string())?;
    s.remove(DataId::FormDescription)
        .map_err(|e| e.to_string())?;
    expect_blob(&s, DataId::FormDescription, None)
}

fn remove_of_absent_id_is_ok<S, F>(factory: &F) -> Result<(), String>
where
    S: PersistentData,
    F: Fn() -> S,
{
    let mut s = factory();
    s.remove(DataId::MailMerge).map_err(|e| e.to_string())?;
    expect_blob(&s, DataId::MailMerge, None)
}
