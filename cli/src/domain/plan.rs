//! The convergence decision core.
//!
//! `plan` is a pure function from one observation and one desired state to
//! an ordered action list. It performs no I/O and never consults live host
//! state; freshness concerns (such as re-checking service registration
//! right before registering) belong to the executor.

use std::fmt;

use crate::domain::agent::{AgentVariant, VARIANTS};
use crate::domain::state::{DesiredAgentState, ObservedAgentState};

/// One step of a convergence plan.
///
/// Each action maps to exactly one platform primitive when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop a registered service before touching its files.
    StopService(AgentVariant),
    /// Invoke the variant's executable with its uninstall directive, which
    /// also deregisters the service.
    Uninstall(AgentVariant),
    /// Recursively delete the shared install directory. Runs at most once
    /// per plan; removing it removes both variants' binaries.
    RemoveInstallDir,
    /// Create the install directory tree. Idempotent.
    CreateInstallDir,
    /// Fetch the target release archive into the install root.
    Download,
    /// Unpack the cached archive into the staging directory.
    Unpack,
    /// Copy staged binaries into their final location.
    PlaceBinaries(AgentVariant),
    /// Invoke the target executable with its install directive. The
    /// executor re-queries the service manager immediately before this
    /// step and skips it when an entry already exists.
    RegisterService(AgentVariant),
}

impl Action {
    /// Stable lowercase name used in reports and error context.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::StopService(_) => "stop-service",
            Self::Uninstall(_) => "uninstall",
            Self::RemoveInstallDir => "remove-install-dir",
            Self::CreateInstallDir => "create-install-dir",
            Self::Download => "download",
            Self::Unpack => "unpack",
            Self::PlaceBinaries(_) => "place-binaries",
            Self::RegisterService(_) => "register-service",
        }
    }

    /// The variant this action operates on, when it targets one.
    #[must_use]
    pub fn variant(self) -> Option<AgentVariant> {
        match self {
            Self::StopService(v)
            | Self::Uninstall(v)
            | Self::PlaceBinaries(v)
            | Self::RegisterService(v) => Some(v),
            Self::RemoveInstallDir | Self::CreateInstallDir | Self::Download | Self::Unpack => None,
        }
    }

    /// True for actions that change host state when executed. The directory
    /// create is idempotent on a correct root, and download/unpack only touch
    /// the cache and staging area.
    #[must_use]
    pub fn is_destructive(self) -> bool {
        !matches!(self, Self::CreateInstallDir | Self::Download | Self::Unpack)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant() {
            Some(v) => write!(f, "{}({v})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// Ordered actions for one reconciliation run.
///
/// Computed fresh each run, consumed once, then discarded; the plan owns no
/// state beyond its own construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergencePlan {
    pub actions: Vec<Action>,
}

impl ConvergencePlan {
    /// A converged host still plans the idempotent directory create and
    /// nothing else.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.actions == [Action::CreateInstallDir]
    }

    /// Actions that change host state when executed (everything except the
    /// idempotent directory create on an already-correct root).
    #[must_use]
    pub fn has_destructive_steps(&self) -> bool {
        self.actions.iter().any(|a| a.is_destructive())
    }
}

/// True when installed binaries force a full reinstall of the target.
///
/// Holds when the target variant is installed at a version other than the
/// pin, or when the target is absent while the other generation is
/// installed (a variant switch always forces a full reinstall, even if the
/// versions superficially match). An unpinned desired version never
/// triggers a reinstall of an installed target.
fn version_change(observed: &ObservedAgentState, desired: &DesiredAgentState) -> bool {
    let target = observed.variant(desired.variant);
    let other = observed.variant(desired.variant.other());

    let pin_mismatch = match (&target.installed, &desired.version) {
        (Some(installed), Some(pinned)) => installed != pinned,
        _ => false,
    };
    pin_mismatch || (!target.is_installed() && other.is_installed())
}

/// True when `variant`'s installed binary must be torn down this run:
/// a change is underway and it is present, or it is simply the non-target
/// generation (leftovers are always removed, even with no version change).
fn must_remove(
    variant: AgentVariant,
    observed: &ObservedAgentState,
    desired: &DesiredAgentState,
) -> bool {
    observed.variant(variant).is_installed()
        && (version_change(observed, desired) || variant != desired.variant)
}

/// Compute the minimal ordered action list converging `observed` to
/// `desired`.
///
/// The order is strict: each step's postcondition is a precondition for
/// the next. Download and Unpack are skipped whenever the target archive
/// is already cached, or the target binary survives the removal steps —
/// a converged re-run performs zero network I/O.
#[must_use]
pub fn plan(observed: &ObservedAgentState, desired: &DesiredAgentState) -> ConvergencePlan {
    let removing: Vec<AgentVariant> = VARIANTS
        .into_iter()
        .filter(|&v| must_remove(v, observed, desired))
        .collect();
    let any_removal = !removing.is_empty();

    let mut actions = Vec::new();
    for &variant in &removing {
        if observed.variant(variant).service_registered {
            actions.push(Action::StopService(variant));
        }
    }
    for &variant in &removing {
        if observed.variant(variant).service_registered {
            actions.push(Action::Uninstall(variant));
        }
    }
    if any_removal {
        actions.push(Action::RemoveInstallDir);
    }
    actions.push(Action::CreateInstallDir);

    let target = observed.variant(desired.variant);
    let binary_survives = target.is_installed() && !any_removal;
    if !observed.package_cached && !binary_survives {
        actions.push(Action::Download);
        actions.push(Action::Unpack);
    }
    if !binary_survives {
        actions.push(Action::PlaceBinaries(desired.variant));
    }
    if !target.service_registered || must_remove(desired.variant, observed, desired) {
        actions.push(Action::RegisterService(desired.variant));
    }

    ConvergencePlan { actions }
}
