//! Unit tests for fleet orchestration and the shared download throttle.

#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use warden_cli::application::services::converge::ConvergenceReport;
use warden_cli::application::services::fleet::{DownloadThrottle, converge_fleet};

fn report(changed: bool) -> ConvergenceReport {
    ConvergenceReport {
        outcomes: Vec::new(),
        changed,
        finished_at: Utc::now(),
    }
}

// ── Fleet orchestration ───────────────────────────────────────────────────────

#[tokio::test]
async fn fleet_outcomes_keep_inventory_order() {
    let names = vec![
        "edge-01".to_string(),
        "edge-02".to_string(),
        "edge-03".to_string(),
    ];

    let fleet = converge_fleet(names, |host| async move {
        if host == "edge-02" {
            anyhow::bail!("download failed on {host}");
        }
        Ok(report(host == "edge-01"))
    })
    .await;

    let hosts: Vec<&str> = fleet.outcomes.iter().map(|o| o.host.as_str()).collect();
    assert_eq!(hosts, vec!["edge-01", "edge-02", "edge-03"]);
    assert_eq!(fleet.failed(), 1);
    assert_eq!(fleet.changed(), 1);
}

#[tokio::test]
async fn one_failing_host_never_cancels_its_siblings() {
    let names: Vec<String> = (1..=4).map(|i| format!("edge-{i:02}")).collect();
    let completed = AtomicUsize::new(0);

    let completed_ref = &completed;
    let fleet = converge_fleet(names, |host| async move {
        if host == "edge-01" {
            anyhow::bail!("unreachable");
        }
        // Yield so sibling futures interleave with the failure.
        tokio::time::sleep(Duration::from_millis(2)).await;
        completed_ref.fetch_add(1, Ordering::SeqCst);
        Ok(report(true))
    })
    .await;

    assert_eq!(fleet.failed(), 1);
    assert_eq!(completed.load(Ordering::SeqCst), 3);
    assert_eq!(fleet.changed(), 3);
}

#[tokio::test]
async fn failed_outcome_carries_the_host_error() {
    let fleet = converge_fleet(vec!["edge-09".to_string()], |host| async move {
        anyhow::bail!("host {host} missing from inventory")
    })
    .await;

    let outcome = &fleet.outcomes[0];
    assert_eq!(outcome.host, "edge-09");
    let err = outcome.result.as_ref().expect_err("must fail");
    assert!(format!("{err:#}").contains("edge-09"));
}

// ── Download throttle ─────────────────────────────────────────────────────────

#[tokio::test]
async fn throttle_caps_simultaneous_holders() {
    let throttle = DownloadThrottle::new(2);
    let current = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let current_ref = &current;
    let peak_ref = &peak;
    let transfers = (0..8).map(|_| {
        let throttle = throttle.clone();
        async move {
            let permit = throttle.acquire().await.expect("open semaphore");
            let holders = current_ref.fetch_add(1, Ordering::SeqCst) + 1;
            peak_ref.fetch_max(holders, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(3)).await;
            current_ref.fetch_sub(1, Ordering::SeqCst);
            drop(permit);
        }
    });
    join_all(transfers).await;

    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(throttle.available(), 2);
}

#[tokio::test]
async fn cloned_throttles_share_one_pool() {
    let throttle = DownloadThrottle::new(1);
    let clone = throttle.clone();

    let permit = throttle.acquire().await.expect("open semaphore");
    assert_eq!(clone.available(), 0);
    drop(permit);
    assert_eq!(clone.available(), 1);
}
