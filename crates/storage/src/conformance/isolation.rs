use super::{expect_blob, TestResult};
use crate::{DataId, PersistentData};

pub(super) fn run_isolation_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: PersistentData,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "isolation",
            "ids_are_independent",
            ids_are_independent(factory),
        ),
        TestResult::from_result(
            "isolation",
            "empty_blob_is_not_absence",
            empty_blob_is_not_absence(factory),
        ),
        TestResult::from_result(
            "isolation",
            "payload_is_stored_verbatim",
            payload_is_stored_verbatim(factory),
        ),
        TestResult::from_result(
            "isolation",
            "ids_lists_present_blobs",
            ids_lists_present_blobs(factory),
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

fn ids_are_independent<S, F>(factory: &F) -> Result<(), String>
where
    S: PersistentData,
    F: Fn() -> S,
{
    let mut s = factory();
    s.set(DataId::PrintFunction, "Serienbrief")
        .map_err(|e| e.to_string())?;
    s.set(DataId::MailMerge, "WM(Seriendruck())")
        .map_err(|e| e.to_string())?;
    s.remove(DataId::PrintFunction)
        .map_err(|e| e.to_string())?;
    expect_blob(&s, DataId::PrintFunction, None)?;
    expect_blob(&s, DataId::MailMerge, Some("WM(Seriendruck())"))
}

fn empty_blob_is_not_absence<S, F>(factory: &F) -> Result<(), String>
where
    S: PersistentData,
    F: Fn() -> S,
{
    let mut s = factory();
    s.set(DataId::SetType, "").map_err(|e| e.to_string())?;
    expect_blob(&s, DataId::SetType, Some(""))
}

fn payload_is_stored_verbatim<S, F>(factory: &F) -> Result<(), String>
where
    S: PersistentData,
    F: Fn() -> S,
{
    let mut s = factory();
    let blob = "WM(Formularwerte((ID 'a' VALUE 'it''s %%%n \"quoted\" äöü')))\n";
    s.set(DataId::FormValues, blob).map_err(|e| e.to_string())?;
    expect_blob(&s, DataId::FormValues, Some(blob))
}

fn ids_lists_present_blobs<S, F>(factory: &F) -> Result<(), String>
where
    S: PersistentData,
    F: Fn() -> S,
{
    let mut s = factory();
    s.set(DataId::FormValues, "x").map_err(|e| e.to_string())?;
    s.set(DataId::SetType, "y").map_err(|e| e.to_string())?;
    let mut ids = s.ids().map_err(|e| e.to_string())?;
    ids.sort();
    if ids != vec![DataId::FormValues, DataId::SetType] {
        return Err(format!("unexpected ids {:?}", ids));
    }
    Ok(())
}
