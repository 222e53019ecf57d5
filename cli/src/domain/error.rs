//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Observation errors ────────────────────────────────────────────────────────

/// Errors raised while inspecting a host. Observation is all-or-nothing:
/// any of these aborts the run before a plan is computed.
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("Found {path} but could not read its version: {reason}")]
    VersionUnreadable { path: String, reason: String },

    #[error("Could not inspect {path}: {reason}")]
    Binary { path: String, reason: String },

    #[error("Service manager query for '{service}' failed: {reason}")]
    ServiceQuery { service: String, reason: String },
}

// ── Download errors ───────────────────────────────────────────────────────────

/// Errors related to fetching a release package.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(
        "No agent version is pinned or resolvable, so no package URL can be built. \
         Pin one with 'warden converge --agent-version <X.Y.Z>'."
    )]
    NoVersion,

    #[error("Server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Download failed after {attempts} attempts: {url}")]
    Exhausted { url: String, attempts: u32 },

    #[error("Checksum mismatch for {package}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        package: String,
        expected: String,
        actual: String,
    },
}

// ── Extraction errors ─────────────────────────────────────────────────────────

/// Errors related to unpacking a release package.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Archive entry '{entry}' escapes the staging directory.")]
    PathTraversal { entry: String },

    #[error(
        "No binaries staged under {staging}. Delete the cached package \
         archive at the install root to force a fresh download."
    )]
    MissingBinaries { staging: String },
}

// ── Execution errors ──────────────────────────────────────────────────────────

/// Errors related to invoking an agent executable.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("'{program}' failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

// ── Service errors ────────────────────────────────────────────────────────────

/// Errors related to service-manager control during plan execution.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Could not {operation} service '{service}': {reason}")]
    Control {
        service: String,
        operation: String,
        reason: String,
    },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to desired-state and inventory configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid version '{value}': expected a semantic version like 7.0.1")]
    InvalidVersion { value: String },

    #[error("Unknown agent variant '{value}'\n\nValid variants: v1, v2")]
    UnknownVariant { value: String },

    #[error("Invalid value for {key}: {value}\n\n{reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Duplicate host '{name}' in inventory; host names must be unique.")]
    DuplicateHost { name: String },
}
