//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use semver::Version;

// ── Value Types ───────────────────────────────────────────────────────────────

/// A service-manager entry found for a queried service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    /// Display name as registered. Observation matches this exactly against
    /// the expected name; a mismatch means "some unrelated service".
    pub display_name: String,
    /// Whether the service is currently running.
    pub running: bool,
}

/// One fully resolved package download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Package URL.
    pub url: String,
    /// Sidecar URL holding the package's SHA-256 digest.
    pub checksum_url: String,
    /// Where the verified archive lands.
    pub dest: PathBuf,
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Binary Inspection Port ────────────────────────────────────────────────────

/// Read-only executable inspection used by the observer.
#[allow(async_fn_in_trait)]
pub trait BinaryInspector {
    /// Report the product version of the executable at `path`, or `None`
    /// when no file exists there.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but its version cannot be
    /// read — that signals corruption or an unsupported binary, never a
    /// clean "absent".
    async fn stat_version(&self, path: &Path) -> Result<Option<Version>>;
}

// ── Service Manager Port ──────────────────────────────────────────────────────

/// Service-manager query and control.
#[allow(async_fn_in_trait)]
pub trait ServiceManager {
    /// Look up a service by name. `None` when no entry exists.
    async fn query(&self, name: &str) -> Result<Option<ServiceEntry>>;

    /// Stop a service. Succeeds when the service is already stopped.
    async fn stop(&self, name: &str) -> Result<()>;

    /// Start a service.
    async fn start(&self, name: &str) -> Result<()>;
}

// ── Host Filesystem Port ──────────────────────────────────────────────────────

/// Local filesystem primitives the executor drives. Sync trait — these are
/// small local operations.
pub trait HostFs {
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents. Returns `true` when anything
    /// was created.
    fn create_dir_all(&self, path: &Path) -> Result<bool>;

    /// Recursively delete `path`. Returns `true` when it existed.
    fn remove_tree(&self, path: &Path) -> Result<bool>;

    /// Copy one file, replacing any file already at `dest`.
    fn copy_file(&self, src: &Path, dest: &Path) -> Result<()>;

    /// List regular files directly under `dir`.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}

// ── Package Fetcher Port ──────────────────────────────────────────────────────

/// Release-archive download with retry, throttling, and checksum
/// verification.
///
/// Transport settings — credentials, proxy, timeout, TLS validation, the
/// retry policy, and the fleet-wide download throttle — are implementation
/// configuration, not per-call parameters.
#[allow(async_fn_in_trait)]
pub trait PackageFetcher {
    /// Fetch `request.url` to `request.dest`, verifying the digest from
    /// `request.checksum_url`. Returns `true` when bytes were written,
    /// `false` when a verified archive was already in place.
    async fn fetch(&self, request: &FetchRequest) -> Result<bool>;
}

// ── Archive Extractor Port ────────────────────────────────────────────────────

/// Package unpacking.
#[allow(async_fn_in_trait)]
pub trait ArchiveExtractor {
    /// Unpack `archive` into `dest`, replacing any previous contents.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

// ── Release Resolver Port ─────────────────────────────────────────────────────

/// Resolves the latest published agent version from the vendor manifest.
#[allow(async_fn_in_trait)]
pub trait ReleaseResolver {
    async fn latest_version(&self) -> Result<Version>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
