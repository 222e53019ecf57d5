//! Application service — plan execution use-case.
//!
//! Drives a `ConvergencePlan` strictly in order, one platform primitive per
//! action, with changed/unchanged bookkeeping per action. Fail-fast: the
//! first failing action aborts the run; partial state is left for the next
//! run's observation to repair. Imports only from `crate::domain` and
//! `crate::application::ports`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::application::ports::{
    ArchiveExtractor, BinaryInspector, CommandRunner, FetchRequest, HostFs, PackageFetcher,
    ProgressReporter, ReleaseResolver, ServiceManager,
};
use crate::application::services::observe::observe_host;
use crate::domain::agent::{AgentVariant, checksum_url, package_url};
use crate::domain::config::SourceConfig;
use crate::domain::error::{DownloadError, ExecutionError, ExtractionError, ServiceError};
use crate::domain::install::InstallLayout;
use crate::domain::plan::{Action, ConvergencePlan, plan};
use crate::domain::state::{DesiredAgentState, ObservedAgentState};

/// Timeout for agent install/uninstall invocations.
const AGENT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

// ── Public types ──────────────────────────────────────────────────────────────

/// Inputs shared by every action of one run.
pub struct ConvergeContext<'a> {
    pub layout: &'a InstallLayout,
    pub desired: &'a DesiredAgentState,
    pub source: &'a SourceConfig,
}

/// Outcome of one executed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action: Action,
    pub changed: bool,
}

/// Aggregated result of one plan execution.
#[derive(Debug, Clone)]
pub struct ConvergenceReport {
    /// One entry per executed action, in execution order.
    pub outcomes: Vec<ActionOutcome>,
    /// Whether any action changed host state.
    pub changed: bool,
    pub finished_at: DateTime<Utc>,
}

impl ConvergenceReport {
    fn record(&mut self, action: Action, changed: bool) {
        self.outcomes.push(ActionOutcome { action, changed });
        self.changed |= changed;
    }

    /// True when this run replaced the binaries on disk.
    #[must_use]
    pub fn replaced_binaries(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o.action, Action::PlaceBinaries(_)) && o.changed)
    }
}

// ── Plan execution ────────────────────────────────────────────────────────────

/// Execute `plan` strictly in order.
///
/// # Errors
///
/// Returns the first action failure, with the failing action named in the
/// error context. Remaining actions are not attempted.
#[allow(clippy::too_many_arguments)]
pub async fn execute_plan(
    ctx: &ConvergeContext<'_>,
    plan: &ConvergencePlan,
    services: &impl ServiceManager,
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    fetcher: &impl PackageFetcher,
    extractor: &impl ArchiveExtractor,
    reporter: &impl ProgressReporter,
) -> Result<ConvergenceReport> {
    let mut report = ConvergenceReport {
        outcomes: Vec::with_capacity(plan.actions.len()),
        changed: false,
        finished_at: Utc::now(),
    };

    for &action in &plan.actions {
        let changed =
            execute_action(action, ctx, services, runner, fs, fetcher, extractor, reporter)
                .await
                .with_context(|| format!("executing {action}"))?;
        report.record(action, changed);
    }

    report.finished_at = Utc::now();
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
async fn execute_action(
    action: Action,
    ctx: &ConvergeContext<'_>,
    services: &impl ServiceManager,
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    fetcher: &impl PackageFetcher,
    extractor: &impl ArchiveExtractor,
    reporter: &impl ProgressReporter,
) -> Result<bool> {
    match action {
        Action::StopService(variant) => stop_service(variant, ctx, services, reporter).await,
        Action::Uninstall(variant) => uninstall_agent(variant, ctx, runner, reporter).await,
        Action::RemoveInstallDir => remove_install_dir(ctx, fs, reporter),
        Action::CreateInstallDir => create_install_dir(ctx, fs),
        Action::Download => download_package(ctx, fetcher, reporter).await,
        Action::Unpack => unpack_package(ctx, extractor, reporter).await,
        Action::PlaceBinaries(variant) => place_binaries(variant, ctx, fs, reporter),
        Action::RegisterService(variant) => {
            register_service(variant, ctx, services, runner, reporter).await
        }
    }
}

async fn stop_service(
    variant: AgentVariant,
    ctx: &ConvergeContext<'_>,
    services: &impl ServiceManager,
    reporter: &impl ProgressReporter,
) -> Result<bool> {
    let name = ctx.layout.service_name(variant);
    reporter.step(&format!("Stopping service {name}..."));
    services.stop(&name).await.map_err(|e| ServiceError::Control {
        service: name.clone(),
        operation: "stop".to_string(),
        reason: format!("{e:#}"),
    })?;
    Ok(true)
}

async fn uninstall_agent(
    variant: AgentVariant,
    ctx: &ConvergeContext<'_>,
    runner: &impl CommandRunner,
    reporter: &impl ProgressReporter,
) -> Result<bool> {
    let display = ctx.layout.expected_display_name(variant);
    reporter.step(&format!("Uninstalling {display}..."));

    let exe = ctx.layout.executable(variant);
    let conf = ctx.layout.config_file(variant);
    let conf = conf.to_string_lossy();
    run_agent(runner, &exe, &["--config", conf.as_ref(), "--uninstall"]).await?;

    reporter.success(&format!("{display} uninstalled"));
    Ok(true)
}

fn remove_install_dir(
    ctx: &ConvergeContext<'_>,
    fs: &impl HostFs,
    reporter: &impl ProgressReporter,
) -> Result<bool> {
    let root = ctx.layout.root();
    reporter.step(&format!("Removing install directory {}...", root.display()));
    let existed = fs
        .remove_tree(root)
        .with_context(|| format!("removing {}", root.display()))?;
    Ok(existed)
}

fn create_install_dir(ctx: &ConvergeContext<'_>, fs: &impl HostFs) -> Result<bool> {
    let mut changed = false;
    for dir in [
        ctx.layout.root().to_path_buf(),
        ctx.layout.bin_dir(),
        ctx.layout.conf_dir(),
    ] {
        changed |= fs
            .create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    Ok(changed)
}

async fn download_package(
    ctx: &ConvergeContext<'_>,
    fetcher: &impl PackageFetcher,
    reporter: &impl ProgressReporter,
) -> Result<bool> {
    let version = ctx.desired.version.as_ref().ok_or(DownloadError::NoVersion)?;
    let url = package_url(&ctx.source.base_url, ctx.desired.variant, version)?;
    let dest = ctx.layout.package_path(ctx.desired.variant, version)?;

    reporter.step(&format!("Downloading {url}..."));
    let request = FetchRequest {
        checksum_url: checksum_url(&url),
        url,
        dest,
    };
    let changed = fetcher.fetch(&request).await?;
    if changed {
        reporter.success("Package downloaded and verified");
    } else {
        reporter.step("Package already cached");
    }
    Ok(changed)
}

async fn unpack_package(
    ctx: &ConvergeContext<'_>,
    extractor: &impl ArchiveExtractor,
    reporter: &impl ProgressReporter,
) -> Result<bool> {
    let version = ctx.desired.version.as_ref().ok_or(DownloadError::NoVersion)?;
    let archive = ctx.layout.package_path(ctx.desired.variant, version)?;

    reporter.step("Unpacking package...");
    extractor
        .extract(&archive, &ctx.layout.staging_dir())
        .await?;
    Ok(true)
}

fn place_binaries(
    variant: AgentVariant,
    ctx: &ConvergeContext<'_>,
    fs: &impl HostFs,
    reporter: &impl ProgressReporter,
) -> Result<bool> {
    let staged_bin = ctx.layout.staging_dir().join("bin");
    let files = fs
        .list_files(&staged_bin)
        .with_context(|| format!("listing staged binaries in {}", staged_bin.display()))?;
    if files.is_empty() {
        return Err(ExtractionError::MissingBinaries {
            staging: staged_bin.display().to_string(),
        }
        .into());
    }

    reporter.step("Placing binaries...");
    let bin_dir = ctx.layout.bin_dir();
    for src in &files {
        let Some(name) = src.file_name() else {
            continue;
        };
        fs.copy_file(src, &bin_dir.join(name))
            .with_context(|| format!("placing {}", src.display()))?;
    }

    // Seed the shipped default config only when the operator has none;
    // an existing config is never overwritten.
    let staged_conf = ctx.layout.staging_dir().join("conf").join(variant.config_name());
    let conf = ctx.layout.config_file(variant);
    if fs.exists(&staged_conf) && !fs.exists(&conf) {
        fs.copy_file(&staged_conf, &conf)
            .with_context(|| format!("seeding default config {}", conf.display()))?;
    }

    reporter.success(&format!(
        "{} binaries placed",
        ctx.layout.expected_display_name(variant)
    ));
    Ok(true)
}

async fn register_service(
    variant: AgentVariant,
    ctx: &ConvergeContext<'_>,
    services: &impl ServiceManager,
    runner: &impl CommandRunner,
    reporter: &impl ProgressReporter,
) -> Result<bool> {
    let name = ctx.layout.service_name(variant);

    // Earlier steps may have changed service reality; trust a fresh query
    // over the pre-removal snapshot.
    let entry = services.query(&name).await.map_err(|e| ServiceError::Control {
        service: name.clone(),
        operation: "query".to_string(),
        reason: format!("{e:#}"),
    })?;
    let expected = ctx.layout.expected_display_name(variant);
    if entry.is_some_and(|e| e.display_name == expected) {
        reporter.step(&format!("Service {name} already registered"));
        return Ok(false);
    }

    reporter.step(&format!("Registering service {name}..."));
    let exe = ctx.layout.executable(variant);
    let conf = ctx.layout.config_file(variant);
    let conf = conf.to_string_lossy();
    run_agent(runner, &exe, &["--config", conf.as_ref(), "--install"]).await?;

    reporter.success(&format!("Service {name} registered"));
    Ok(true)
}

/// Invoke an agent executable and fail on non-zero exit.
async fn run_agent(runner: &impl CommandRunner, exe: &Path, args: &[&str]) -> Result<()> {
    let program = exe.to_string_lossy();
    let output = runner
        .run_with_timeout(program.as_ref(), args, AGENT_COMMAND_TIMEOUT)
        .await?;
    if !output.status.success() {
        return Err(ExecutionError::Failed {
            program: program.into_owned(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(())
}

// ── Post-plan activation ──────────────────────────────────────────────────────

/// Make sure the target agent's service is active after a successful run.
///
/// Starts the service when it is registered but stopped, and restarts it
/// when the run replaced the binary under a running service so the new
/// build actually serves. Returns whether anything was started or
/// restarted.
///
/// # Errors
///
/// Returns `ServiceError` when a query, stop, or start fails.
pub async fn ensure_agent_running(
    ctx: &ConvergeContext<'_>,
    report: &ConvergenceReport,
    services: &impl ServiceManager,
    reporter: &impl ProgressReporter,
) -> Result<bool> {
    let variant = ctx.desired.variant;
    let name = ctx.layout.service_name(variant);
    let entry = services.query(&name).await.map_err(|e| ServiceError::Control {
        service: name.clone(),
        operation: "query".to_string(),
        reason: format!("{e:#}"),
    })?;

    let Some(entry) = entry else {
        reporter.warn(&format!("Service {name} is not registered; nothing to start"));
        return Ok(false);
    };
    if entry.display_name != ctx.layout.expected_display_name(variant) {
        reporter.warn(&format!(
            "Service name {name} is occupied by '{}'; leaving it alone",
            entry.display_name
        ));
        return Ok(false);
    }

    if entry.running && report.replaced_binaries() {
        reporter.step(&format!("Restarting {name} to pick up the new binary..."));
        control_service(services, &name, "stop").await?;
        control_service(services, &name, "start").await?;
        reporter.success(&format!("Service {name} restarted"));
        return Ok(true);
    }
    if !entry.running {
        reporter.step(&format!("Starting {name}..."));
        control_service(services, &name, "start").await?;
        reporter.success(&format!("Service {name} started"));
        return Ok(true);
    }
    Ok(false)
}

async fn control_service(
    services: &impl ServiceManager,
    name: &str,
    operation: &str,
) -> Result<()> {
    let result = match operation {
        "stop" => services.stop(name).await,
        _ => services.start(name).await,
    };
    result.map_err(|e| {
        ServiceError::Control {
            service: name.to_string(),
            operation: operation.to_string(),
            reason: format!("{e:#}"),
        }
        .into()
    })
}

// ── Full reconciliation ───────────────────────────────────────────────────────

/// Whether executing the plan requires a concrete package version.
fn plan_needs_version(plan: &ConvergencePlan) -> bool {
    plan.actions
        .iter()
        .any(|a| matches!(a, Action::Download | Action::Unpack))
}

/// Observe and plan, pinning the latest published release when the plan
/// would download a package and no version is pinned.
///
/// An unpinned desired state accepts any installed version, so a host that
/// already has the target binary converges without touching the network.
/// Only when the plan contains a download step does the release feed get
/// consulted; observation and planning then rerun against the pinned
/// version, since the archive for it may already be cached.
///
/// # Errors
///
/// Returns observation failures, or release resolution failures when the
/// plan needs a version.
pub async fn prepare_run(
    layout: &InstallLayout,
    desired: DesiredAgentState,
    inspector: &impl BinaryInspector,
    services: &impl ServiceManager,
    fs: &impl HostFs,
    resolver: &impl ReleaseResolver,
    reporter: &impl ProgressReporter,
) -> Result<(ObservedAgentState, DesiredAgentState, ConvergencePlan)> {
    let observed = observe_host(layout, &desired, inspector, services, fs).await?;
    let initial = plan(&observed, &desired);
    if desired.version.is_some() || !plan_needs_version(&initial) {
        return Ok((observed, desired, initial));
    }

    reporter.step("No version pinned; resolving the latest release");
    let latest = resolver.latest_version().await?;
    reporter.success(&format!("Latest release is {latest}"));

    let desired = DesiredAgentState {
        version: Some(latest),
        ..desired
    };
    let observed = observe_host(layout, &desired, inspector, services, fs).await?;
    let resolved = plan(&observed, &desired);
    Ok((observed, desired, resolved))
}

/// One complete reconciliation: observe, plan, execute, activate.
///
/// This is the non-interactive composition used per fleet host; the
/// interactive `converge` command assembles the same steps itself so it can
/// confirm between planning and execution.
///
/// # Errors
///
/// Returns the first observation, resolution, or execution failure.
#[allow(clippy::too_many_arguments)]
pub async fn run_reconciliation(
    layout: &InstallLayout,
    desired: DesiredAgentState,
    source: &SourceConfig,
    inspector: &impl BinaryInspector,
    services: &impl ServiceManager,
    runner: &impl CommandRunner,
    fs: &impl HostFs,
    fetcher: &impl PackageFetcher,
    extractor: &impl ArchiveExtractor,
    resolver: &impl ReleaseResolver,
    reporter: &impl ProgressReporter,
) -> Result<ConvergenceReport> {
    let (_, desired, plan) =
        prepare_run(layout, desired, inspector, services, fs, resolver, reporter).await?;
    let ctx = ConvergeContext {
        layout,
        desired: &desired,
        source,
    };
    let report =
        execute_plan(&ctx, &plan, services, runner, fs, fetcher, extractor, reporter).await?;
    ensure_agent_running(&ctx, &report, services, reporter).await?;
    Ok(report)
}
