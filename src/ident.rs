//! Workflow identifier format checks.
//!
//! The remote assigns fixed-length alphanumeric ids. This is the only
//! remote-side identifier rule the engine enforces: a candidate id written
//! into a staged file must meet the format before it can be trusted as a
//! reference to an existing workflow.

use once_cell::sync::Lazy;
use regex::Regex;

/// Length of a remote-assigned workflow identifier.
pub const WORKFLOW_ID_LEN: usize = 16;

/// Static regex for the workflow id format (compiled once on first use)
#[expect(
    clippy::expect_used,
    reason = "Regex literal is compile-time constant and cannot fail"
)]
static WORKFLOW_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^[A-Za-z0-9]{{{WORKFLOW_ID_LEN}}}$"))
        .expect("WORKFLOW_ID_RE is a valid regex literal")
});

/// Whether `id` matches the fixed-length alphanumeric workflow id format.
#[must_use]
pub fn is_valid_workflow_id(id: &str) -> bool {
    WORKFLOW_ID_RE.is_match(id)
}
