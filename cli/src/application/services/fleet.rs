//! Application service — fleet convergence use-case.
//!
//! Runs one reconciliation per inventory host, all hosts concurrently and
//! independently. The only cross-host coordination is the shared download
//! throttle; a failing host never aborts its siblings.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::application::services::converge::ConvergenceReport;

// ── Download throttle ─────────────────────────────────────────────────────────

/// Fleet-wide cap on simultaneous downloads.
///
/// Cloned handles share one underlying semaphore. A permit must be held for
/// the whole transfer, retries included, so a slow mirror cannot be
/// dogpiled by the rest of the fleet.
#[derive(Clone)]
pub struct DownloadThrottle {
    slots: Arc<Semaphore>,
}

impl DownloadThrottle {
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(slots)),
        }
    }

    /// Wait for a download slot.
    ///
    /// # Errors
    ///
    /// Fails only if the semaphore is closed, which this type never does.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.slots
            .clone()
            .acquire_owned()
            .await
            .context("download throttle closed")
    }

    /// Slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

// ── Fleet run ─────────────────────────────────────────────────────────────────

/// Result of one host's reconciliation.
pub struct HostOutcome {
    pub host: String,
    pub result: Result<ConvergenceReport>,
}

/// Aggregated fleet results, in inventory order.
pub struct FleetReport {
    pub outcomes: Vec<HostOutcome>,
}

impl FleetReport {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    #[must_use]
    pub fn changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Ok(r) if r.changed))
            .count()
    }
}

/// Run `run_host` once per host name, all hosts concurrently.
///
/// Hosts are fully independent: each gets its own observation, plan, and
/// execution, and one host's failure is recorded without cancelling the
/// others. Anything shared across hosts lives inside the closure — in
/// production, the download throttle inside each host's package fetcher.
pub async fn converge_fleet<F, Fut>(hosts: Vec<String>, run_host: F) -> FleetReport
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<ConvergenceReport>>,
{
    let runs = hosts.into_iter().map(|host| {
        let fut = run_host(host.clone());
        async move {
            HostOutcome {
                host,
                result: fut.await,
            }
        }
    });
    FleetReport {
        outcomes: join_all(runs).await,
    }
}
