//! Conformance test suite for [`PersistentData`] implementations.
//!
//! The suite covers:
//!
//! - **Blobs**: set, get, replace and remove of a single id
//! - **Isolation**: ids never affect each other, absence stays distinct from
//!   an empty blob, unusual payloads survive unchanged
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that creates
//! a fresh, empty store for each test:
//!
//! ```ignore
//! use formdoc_storage::conformance::run_conformance_suite;
//!
//! #[test]
//! fn host_store_conformance() {
//!     let report = run_conformance_suite(HostStore::for_new_document);
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod blobs;
mod isolation;

use std::fmt;

use crate::PersistentData;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "blobs", "isolation").
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in self.results.iter().filter(|r| !r.passed) {
            writeln!(
                f,
                "  FAIL [{}/{}]: {}",
                r.category,
                r.name,
                r.message.as_deref().unwrap_or("(no message)")
            )?;
        }
        Ok(())
    }
}

/// Run the full conformance suite against a persistence backend.
///
/// `factory` is called once per test so every test starts from an empty store.
pub fn run_conformance_suite<S, F>(factory: F) -> ConformanceReport
where
    S: PersistentData,
    F: Fn() -> S,
{
    let mut results = Vec::new();

    results.extend(blobs::run_blob_tests(&factory));
    results.extend(isolation::run_isolation_tests(&factory));

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

fn expect_blob(
    s: &dyn PersistentData,
    id: crate::DataId,
    expected: Option<&str>,
) -> Result<(), String> {
    let got = s.get(id).map_err(|e| e.to_string())?;
    if got.as_deref() != expected {
        return Err(format!("{}: expected {:?}, got {:?}", id, expected, got));
    }
    Ok(())
}
