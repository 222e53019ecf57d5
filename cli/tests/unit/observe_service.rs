//! Unit tests for host observation.
//!
//! Tests exercise the observation service directly with stub ports, so no
//! real binaries or service manager are involved.

#![allow(clippy::expect_used)]

use warden_cli::application::services::observe::observe_host;
use warden_cli::domain::agent::AgentVariant;
use warden_cli::domain::error::ObservationError;
use warden_cli::domain::install::InstallLayout;
use warden_cli::domain::state::DesiredAgentState;

use crate::mocks::{
    FailingInspector, FailingServices, StubFs, StubInspector, StubServices, version,
};

fn layout() -> InstallLayout {
    InstallLayout::new("/opt/sentinel")
}

fn unpinned(variant: AgentVariant) -> DesiredAgentState {
    DesiredAgentState {
        variant,
        version: None,
    }
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn pinned(variant: AgentVariant, v: &str) -> DesiredAgentState {
    DesiredAgentState {
        variant,
        version: Some(version(v)),
    }
}

// ── Variant observation ───────────────────────────────────────────────────────

#[tokio::test]
async fn bare_host_observes_all_absent() {
    let observed = observe_host(
        &layout(),
        &unpinned(AgentVariant::V1),
        &StubInspector::default(),
        &StubServices::default(),
        &StubFs::default(),
    )
    .await
    .expect("observation");

    assert!(!observed.v1.is_installed());
    assert!(!observed.v1.service_registered);
    assert!(!observed.v2.is_installed());
    assert!(!observed.v2.service_registered);
    assert!(!observed.package_cached);
}

#[tokio::test]
async fn installed_and_registered_variant_is_observed() {
    let inspector = StubInspector::default().with("/opt/sentinel/bin/sentinel2", "7.0.1");
    let services = StubServices::default().with("sentinel-agent2", "Sentinel Agent 2", true);

    let observed = observe_host(
        &layout(),
        &unpinned(AgentVariant::V2),
        &inspector,
        &services,
        &StubFs::default(),
    )
    .await
    .expect("observation");

    assert_eq!(observed.v2.installed, Some(version("7.0.1")));
    assert!(observed.v2.service_registered);
    assert!(!observed.v1.is_installed());
}

#[tokio::test]
async fn foreign_display_name_does_not_count_as_registered() {
    let services = StubServices::default().with("sentinel-agent", "Acme Backup Daemon", true);

    let observed = observe_host(
        &layout(),
        &unpinned(AgentVariant::V1),
        &StubInspector::default(),
        &services,
        &StubFs::default(),
    )
    .await
    .expect("observation");

    assert!(!observed.v1.service_registered);
}

#[tokio::test]
async fn instance_scopes_the_service_query() {
    let scoped = InstallLayout::with_instance("/opt/sentinel", Some("edge-01".to_string()));
    // The unscoped entry must not satisfy a scoped observation.
    let services = StubServices::default()
        .with("sentinel-agent", "Sentinel Agent", true)
        .with("sentinel-agent@edge-01", "Sentinel Agent (edge-01)", false);

    let observed = observe_host(
        &scoped,
        &unpinned(AgentVariant::V1),
        &StubInspector::default(),
        &services,
        &StubFs::default(),
    )
    .await
    .expect("observation");

    assert!(observed.v1.service_registered);
    assert!(
        services
            .ops()
            .contains(&"query sentinel-agent@edge-01".to_string())
    );
}

// ── Package cache ─────────────────────────────────────────────────────────────

#[tokio::test]
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
async fn pinned_version_detects_the_cached_archive() {
    let fs = StubFs::default();
    fs.add_file("/opt/sentinel/sentinel_agent-7.0.1-linux-amd64.tar.gz");

    let observed = observe_host(
        &layout(),
        &pinned(AgentVariant::V1, "7.0.1"),
        &StubInspector::default(),
        &StubServices::default(),
        &fs,
    )
    .await
    .expect("observation");

    assert!(observed.package_cached);
}

#[tokio::test]
async fn unpinned_version_never_reports_a_cached_package() {
    let fs = StubFs::default();
    fs.add_file("/opt/sentinel/sentinel_agent-7.0.1-linux-amd64.tar.gz");

    let observed = observe_host(
        &layout(),
        &unpinned(AgentVariant::V1),
        &StubInspector::default(),
        &StubServices::default(),
        &fs,
    )
    .await
    .expect("observation");

    assert!(!observed.package_cached);
}

// ── Failure modes ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn version_read_failure_aborts_the_observation() {
    let err = observe_host(
        &layout(),
        &unpinned(AgentVariant::V1),
        &FailingInspector,
        &StubServices::default(),
        &StubFs::default(),
    )
    .await
    .expect_err("corrupt binary must abort");

    assert!(matches!(
        err.downcast_ref::<ObservationError>(),
        Some(ObservationError::VersionUnreadable { .. })
    ));
}

#[tokio::test]
async fn service_query_failure_names_the_service() {
    let err = observe_host(
        &layout(),
        &unpinned(AgentVariant::V1),
        &StubInspector::default(),
        &FailingServices,
        &StubFs::default(),
    )
    .await
    .expect_err("unreachable service manager must abort");

    match err.downcast_ref::<ObservationError>() {
        Some(ObservationError::ServiceQuery { service, .. }) => {
            assert_eq!(service, "sentinel-agent");
        }
        other => panic!("expected ServiceQuery, got {other:?}"),
    }
}
