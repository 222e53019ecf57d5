//! Status command — observed vs desired agent state on this host.

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::{ServiceEntry, ServiceManager};
use crate::application::services::observe::observe_host;
use crate::commands::{HostStack, TargetArgs, describe_target};
use crate::domain::agent::{AgentVariant, VARIANTS};
use crate::domain::plan::plan;
use crate::domain::state::VariantObservation;

/// Run `warden status`.
///
/// # Errors
///
/// Returns an error when observation fails: an unreadable agent binary or a
/// service manager that cannot be queried.
pub async fn run(app: &AppContext, args: &TargetArgs) -> Result<ExitCode> {
    let desired = app.desired(args.agent.as_deref(), args.agent_version.as_deref())?;
    let layout = app.layout(args.install_root.as_deref(), args.instance.as_deref());
    let stack = HostStack::new();

    let observed = observe_host(
        &layout,
        &desired,
        &stack.inspector,
        &stack.services,
        &stack.fs,
    )
    .await?;
    let pending = plan(&observed, &desired);

    // Activation state is not part of the convergence decision, so the
    // observation does not carry it; query it separately for display.
    let mut entries: Vec<(AgentVariant, Option<ServiceEntry>)> = Vec::new();
    for variant in VARIANTS {
        let entry = stack.services.query(&layout.service_name(variant)).await?;
        entries.push((variant, entry));
    }

    if app.is_json() {
        let variants: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(variant, entry)| {
                (
                    variant.label().to_string(),
                    variant_payload(observed.variant(*variant), entry.as_ref()),
                )
            })
            .collect();
        let out = serde_json::json!({
            "install_root": layout.root(),
            "instance": layout.instance(),
            "desired": {
                "variant": desired.variant.label(),
                "version": desired.version.as_ref().map(ToString::to_string),
            },
            "observed": variants,
            "package_cached": observed.package_cached,
            "converged": pending.is_converged(),
            "pending_actions": pending.actions.iter().map(|a| a.name()).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("JSON serialization")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    app.output.header("Sentinel Agent Status");
    println!();
    app.output.kv("Install root:", &layout.root().display().to_string());
    if let Some(instance) = layout.instance() {
        app.output.kv("Instance:    ", instance);
    }
    app.output.kv("Desired:     ", &describe_target(&desired));
    println!();

    for (variant, entry) in &entries {
        app.output.agent_kv(
            &format!("{variant}:          "),
            &variant_line(observed.variant(*variant), entry.as_ref()),
        );
    }
    println!();

    for variant in observed.orphaned_variants() {
        app.output.warn(&format!(
            "Service {} is registered but {} is not installed",
            layout.service_name(variant),
            variant.executable_name(),
        ));
    }

    if pending.is_converged() {
        app.output.success("Converged; nothing to do");
    } else {
        app.output.info(&format!(
            "{} pending; run 'warden plan' to review",
            count_actions(pending.actions.len()),
        ));
    }
    println!();

    Ok(ExitCode::SUCCESS)
}

// ── Formatting helpers ────────────────────────────────────────────────────────

/// Human line for one variant's observed state.
fn variant_line(obs: &VariantObservation, entry: Option<&ServiceEntry>) -> String {
    match (&obs.installed, obs.service_registered) {
        (None, false) => "not installed".to_string(),
        (None, true) => "not installed, stale service entry".to_string(),
        (Some(version), false) => format!("{version} installed, no service entry"),
        (Some(version), true) => {
            let activation = match entry {
                Some(e) if e.running => "running",
                _ => "stopped",
            };
            format!("{version} installed, service {activation}")
        }
    }
}

/// `1 action` / `n actions`.
fn count_actions(count: usize) -> String {
    let noun = if count == 1 { "action" } else { "actions" };
    format!("{count} {noun}")
}

/// JSON fragment for one variant's observed state.
fn variant_payload(obs: &VariantObservation, entry: Option<&ServiceEntry>) -> serde_json::Value {
    serde_json::json!({
        "installed": obs.installed.as_ref().map(ToString::to_string),
        "service_registered": obs.service_registered,
        "service_running": entry.map(|e| e.running),
    })
}
