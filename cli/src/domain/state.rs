//! Observed and desired agent state.
//!
//! Value types only. Observation fills them in (`application::services::
//! observe`), the planner consumes them (`domain::plan`), nothing mutates
//! them in between.

use semver::Version;

use crate::domain::agent::AgentVariant;

/// What observation found for one agent variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantObservation {
    /// Installed product version. `Some` iff the variant's executable exists
    /// on disk. A present binary whose version cannot be read is an
    /// observation error, never `None`.
    pub installed: Option<Version>,
    /// A service entry exists under the expected service name and carries
    /// the exact expected display name. Independent of `installed`: a
    /// service entry can outlive its binary and vice versa.
    pub service_registered: bool,
}

impl VariantObservation {
    /// Observation of a variant with no trace on the host.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            installed: None,
            service_registered: false,
        }
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.is_some()
    }
}

/// Snapshot of one host, taken once per run before planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedAgentState {
    pub v1: VariantObservation,
    pub v2: VariantObservation,
    /// The target release archive is already cached at the install root.
    /// Always `false` when no version is pinned (the package name is
    /// unknowable then).
    pub package_cached: bool,
}

impl ObservedAgentState {
    #[must_use]
    pub fn variant(&self, variant: AgentVariant) -> &VariantObservation {
        match variant {
            AgentVariant::V1 => &self.v1,
            AgentVariant::V2 => &self.v2,
        }
    }

    /// Variants with a live service entry but no binary on disk.
    ///
    /// Convergence leaves such entries alone (the binary wins as the source
    /// of truth); surfacing them is the caller's concern.
    #[must_use]
    pub fn orphaned_variants(&self) -> Vec<AgentVariant> {
        crate::domain::agent::VARIANTS
            .into_iter()
            .filter(|&v| self.variant(v).service_registered && !self.variant(v).is_installed())
            .collect()
    }
}

/// The end state a run converges toward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredAgentState {
    /// Which generation should be installed.
    pub variant: AgentVariant,
    /// Pinned version. `None` accepts any installed version of the target
    /// variant; download-bearing plans still need a concrete version, which
    /// the converge flow resolves before executing.
    pub version: Option<Version>,
}
