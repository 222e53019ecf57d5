//! JSON output helpers.
//!
//! Provides the error-object formatter used by all `--json` code paths when
//! a command fails.

use anyhow::{Context, Result};

use crate::domain::error::{
    ConfigError, DownloadError, ExecutionError, ExtractionError, ObservationError, ServiceError,
};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen in
/// practice — `serde_json` only fails on non-finite floats and maps with
/// non-string keys, neither of which appear here).
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable error code for a failure.
///
/// Derived from the typed domain error anywhere in the chain (context
/// wrapping included); `"error"` when the failure carries none.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<ObservationError>().is_some() {
        "observation-failed"
    } else if err.downcast_ref::<DownloadError>().is_some() {
        "download-failed"
    } else if err.downcast_ref::<ExtractionError>().is_some() {
        "extraction-failed"
    } else if err.downcast_ref::<ExecutionError>().is_some() {
        "execution-failed"
    } else if err.downcast_ref::<ServiceError>().is_some() {
        "service-failed"
    } else if err.downcast_ref::<ConfigError>().is_some() {
        "config-invalid"
    } else {
        "error"
    }
}
