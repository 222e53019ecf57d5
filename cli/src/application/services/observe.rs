//! Application service — host observation use-case.
//!
//! Produces the immutable `ObservedAgentState` snapshot a reconciliation
//! run plans from. Read-only: nothing here mutates the host. Imports only
//! from `crate::domain` and `crate::application::ports`.

use anyhow::Result;

use crate::application::ports::{BinaryInspector, HostFs, ServiceManager};
use crate::domain::agent::AgentVariant;
use crate::domain::error::ObservationError;
use crate::domain::install::InstallLayout;
use crate::domain::state::{DesiredAgentState, ObservedAgentState, VariantObservation};

/// Inspect the host and return a complete observation.
///
/// Observation is all-or-nothing: any inspection failure aborts the run
/// before planning, so a plan is never computed from partial data.
///
/// # Errors
///
/// Returns `ObservationError` when a binary stat, a version read of a
/// present binary, or a service query fails.
pub async fn observe_host(
    layout: &InstallLayout,
    desired: &DesiredAgentState,
    inspector: &impl BinaryInspector,
    services: &impl ServiceManager,
    fs: &impl HostFs,
) -> Result<ObservedAgentState> {
    let v1 = observe_variant(AgentVariant::V1, layout, inspector, services).await?;
    let v2 = observe_variant(AgentVariant::V2, layout, inspector, services).await?;

    // The package cache is only decidable with a pinned version; without
    // one the package name is unknowable.
    let package_cached = match &desired.version {
        Some(version) => {
            let path = layout.package_path(desired.variant, version)?;
            fs.exists(&path)
        }
        None => false,
    };

    Ok(ObservedAgentState {
        v1,
        v2,
        package_cached,
    })
}

async fn observe_variant(
    variant: AgentVariant,
    layout: &InstallLayout,
    inspector: &impl BinaryInspector,
    services: &impl ServiceManager,
) -> Result<VariantObservation> {
    let installed = inspector.stat_version(&layout.executable(variant)).await?;

    let service = layout.service_name(variant);
    let entry = services
        .query(&service)
        .await
        .map_err(|e| ObservationError::ServiceQuery {
            service: service.clone(),
            reason: format!("{e:#}"),
        })?;

    // Exact display-name match guards against unrelated services that
    // happen to occupy the expected service name.
    let expected = layout.expected_display_name(variant);
    let service_registered = entry.is_some_and(|e| e.display_name == expected);

    Ok(VariantObservation {
        installed,
        service_registered,
    })
}
