//! Command implementations

pub mod check;
pub mod converge;
pub mod fleet;
pub mod plan;
pub mod status;
pub mod version;

use std::path::PathBuf;

use clap::Args;

use crate::domain::state::DesiredAgentState;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::fs::LocalHostFs;
use crate::infra::inspect::AgentBinaryInspector;
use crate::infra::service::SystemServiceManager;

/// Flags selecting the target agent and install location, shared by the
/// host-level commands.
#[derive(Args)]
pub struct TargetArgs {
    /// Agent generation to manage (v1 or v2)
    #[arg(long, value_name = "VARIANT")]
    pub agent: Option<String>,

    /// Exact version to pin (e.g. 7.0.1)
    #[arg(long, value_name = "VERSION")]
    pub agent_version: Option<String>,

    /// Install root (platform default when unset)
    #[arg(long, value_name = "PATH")]
    pub install_root: Option<PathBuf>,

    /// Instance name scoping service registrations
    #[arg(long, value_name = "NAME")]
    pub instance: Option<String>,
}

/// Platform adapters for the local host, one set per command invocation.
pub(crate) struct HostStack {
    pub runner: TokioCommandRunner,
    pub services: SystemServiceManager<TokioCommandRunner>,
    pub inspector: AgentBinaryInspector<TokioCommandRunner>,
    pub fs: LocalHostFs,
}

impl HostStack {
    pub fn new() -> Self {
        Self {
            runner: TokioCommandRunner::default(),
            services: SystemServiceManager::new(TokioCommandRunner::default()),
            inspector: AgentBinaryInspector::new(TokioCommandRunner::default()),
            fs: LocalHostFs,
        }
    }
}

/// Human label for a desired state: `v2 7.0.1` or `v1 (any version)`.
pub(crate) fn describe_target(desired: &DesiredAgentState) -> String {
    match &desired.version {
        Some(version) => format!("{} {version}", desired.variant),
        None => format!("{} (any version)", desired.variant),
    }
}
