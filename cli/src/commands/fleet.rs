//! Fleet command — reconcile every inventory host concurrently.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::{AppContext, default_inventory_path, load_inventory};
use crate::application::services::converge::{ConvergenceReport, run_reconciliation};
use crate::application::services::fleet::{DownloadThrottle, FleetReport, converge_fleet};
use crate::commands::HostStack;
use crate::domain::config::{FleetHost, WardenConfig, desired_for_host};
use crate::domain::install::InstallLayout;
use crate::infra::archive::TarGzExtractor;
use crate::infra::fetch::HttpPackageFetcher;
use crate::infra::release::HttpReleaseResolver;
use crate::output::reporter::PrefixedReporter;

/// Arguments for the fleet command.
#[derive(Args)]
pub struct FleetArgs {
    /// Inventory file (defaults to ~/.warden/fleet.yaml)
    #[arg(long, value_name = "PATH")]
    pub inventory: Option<PathBuf>,
}

/// Run `warden fleet`.
///
/// Every host converges independently and concurrently; the shared download
/// throttle is the only coordination between them. One host failing never
/// stops the others, and the exit code reports whether any host failed.
///
/// # Errors
///
/// Returns an error when the inventory cannot be loaded. Per-host failures
/// are collected into the report instead.
pub async fn run(app: &AppContext, args: &FleetArgs) -> Result<ExitCode> {
    let path = match &args.inventory {
        Some(path) => path.clone(),
        None => default_inventory_path()?,
    };
    let inventory = load_inventory(&path)?;

    // One fetcher for the whole fleet; its throttle is the fleet-wide cap
    // on simultaneous downloads. Per-package progress bars would interleave
    // across hosts, so fleet downloads run without them.
    let throttle = DownloadThrottle::new(inventory.downloads);
    let fetcher = HttpPackageFetcher::new(&inventory.defaults.source, throttle, true)?;
    let extractor = TarGzExtractor;
    let resolver = HttpReleaseResolver::new(&inventory.defaults.source);

    let names: Vec<String> = inventory.hosts.iter().map(|h| h.name.clone()).collect();
    let quiet = app.output.quiet || app.is_json();

    if !app.is_json() {
        println!();
        app.output.header(&format!(
            "Converging {} ({} download slots)",
            count_hosts(names.len()),
            inventory.downloads,
        ));
        println!();
    }

    let hosts = &inventory.hosts;
    let defaults = &inventory.defaults;
    let fetcher = &fetcher;
    let extractor = &extractor;
    let resolver = &resolver;
    let report = converge_fleet(names, |name| async move {
        let Some(host) = hosts.iter().find(|h| h.name == name) else {
            anyhow::bail!("host {name} missing from inventory");
        };
        run_host(host, defaults, fetcher, extractor, resolver, quiet).await
    })
    .await;

    render_fleet_report(app, &report)?;
    if report.failed() > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Reconcile one inventory host against the shared defaults.
async fn run_host(
    host: &FleetHost,
    defaults: &WardenConfig,
    fetcher: &HttpPackageFetcher,
    extractor: &TarGzExtractor,
    resolver: &HttpReleaseResolver,
    quiet: bool,
) -> Result<ConvergenceReport> {
    let desired = desired_for_host(host, defaults)?;
    let layout = InstallLayout::with_instance(
        host.install_root.clone(),
        Some(host.effective_instance().to_string()),
    );
    let stack = HostStack::new();
    let reporter = PrefixedReporter::new(&host.name, quiet);

    run_reconciliation(
        &layout,
        desired,
        &defaults.source,
        &stack.inspector,
        &stack.services,
        &stack.runner,
        &stack.fs,
        fetcher,
        extractor,
        resolver,
        &reporter,
    )
    .await
}

/// Render the aggregated fleet report.
fn render_fleet_report(app: &AppContext, report: &FleetReport) -> Result<()> {
    if app.is_json() {
        let hosts: Vec<serde_json::Value> = report
            .outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(r) => serde_json::json!({
                    "host": outcome.host,
                    "ok": true,
                    "changed": r.changed,
                    "actions": r
                        .outcomes
                        .iter()
                        .map(|o| {
                            serde_json::json!({
                                "action": o.action.name(),
                                "changed": o.changed,
                            })
                        })
                        .collect::<Vec<_>>(),
                }),
                Err(e) => serde_json::json!({
                    "host": outcome.host,
                    "ok": false,
                    "error": format!("{e:#}"),
                }),
            })
            .collect();
        let out = serde_json::json!({
            "hosts": hosts,
            "failed": report.failed(),
            "changed": report.changed(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("JSON serialization")?
        );
        return Ok(());
    }

    println!();
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(r) if r.changed => {
                let changes = r.outcomes.iter().filter(|o| o.changed).count();
                app.output.success(&format!(
                    "{}: converged ({changes} changed)",
                    outcome.host
                ));
            }
            Ok(_) => {
                app.output
                    .success(&format!("{}: already converged", outcome.host));
            }
            Err(e) => {
                app.output.error(&format!("{}: {e:#}", outcome.host));
            }
        }
    }
    println!();

    let total = report.outcomes.len();
    let failed = report.failed();
    if failed > 0 {
        app.output.error(&format!(
            "{} of {} failed; re-run after fixing the errors above",
            count_hosts(failed),
            total,
        ));
    } else {
        app.output.success(&format!(
            "{} converged ({} changed)",
            count_hosts(total),
            report.changed(),
        ));
    }
    println!();
    Ok(())
}

/// `1 host` / `n hosts`.
fn count_hosts(count: usize) -> String {
    let noun = if count == 1 { "host" } else { "hosts" };
    format!("{count} {noun}")
}
