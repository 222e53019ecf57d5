//! Plan command — the actions a converge run would execute.

use std::process::ExitCode;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use crate::app::AppContext;
use crate::application::services::converge::prepare_run;
use crate::commands::{HostStack, TargetArgs, describe_target};
use crate::domain::install::InstallLayout;
use crate::domain::plan::ConvergencePlan;
use crate::domain::state::DesiredAgentState;
use crate::infra::release::HttpReleaseResolver;
use crate::output::reporter::{SilentReporter, TerminalReporter};

/// Run `warden plan`.
///
/// # Errors
///
/// Returns an error when observation fails, or when the latest release must
/// be resolved and the release feed is unreachable.
pub async fn run(app: &AppContext, args: &TargetArgs) -> Result<ExitCode> {
    let desired = app.desired(args.agent.as_deref(), args.agent_version.as_deref())?;
    let layout = app.layout(args.install_root.as_deref(), args.instance.as_deref());
    let stack = HostStack::new();

    let (desired, plan) = compute(app, &stack, &layout, desired).await?;
    render_plan(app, &layout, &desired, &plan)?;
    Ok(ExitCode::SUCCESS)
}

/// Observe the host and compute the plan, pinning the latest release when
/// the plan needs a version. Progress is silent in JSON mode so stdout
/// carries only the payload.
pub(crate) async fn compute(
    app: &AppContext,
    stack: &HostStack,
    layout: &InstallLayout,
    desired: DesiredAgentState,
) -> Result<(DesiredAgentState, ConvergencePlan)> {
    let resolver = HttpReleaseResolver::new(&app.config.source);
    let (_, desired, plan) = if app.is_json() {
        prepare_run(
            layout,
            desired,
            &stack.inspector,
            &stack.services,
            &stack.fs,
            &resolver,
            &SilentReporter,
        )
        .await?
    } else {
        prepare_run(
            layout,
            desired,
            &stack.inspector,
            &stack.services,
            &stack.fs,
            &resolver,
            &TerminalReporter::new(&app.output),
        )
        .await?
    };
    Ok((desired, plan))
}

/// Render a plan, shared by `warden plan` and `warden converge --check`.
pub(crate) fn render_plan(
    app: &AppContext,
    layout: &InstallLayout,
    desired: &DesiredAgentState,
    plan: &ConvergencePlan,
) -> Result<()> {
    if app.is_json() {
        let out = serde_json::json!({
            "install_root": layout.root(),
            "desired": {
                "variant": desired.variant.label(),
                "version": desired.version.as_ref().map(ToString::to_string),
            },
            "actions": plan
                .actions
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "action": a.name(),
                        "variant": a.variant().map(|v| v.label()),
                    })
                })
                .collect::<Vec<_>>(),
            "converged": plan.is_converged(),
            "destructive": plan.has_destructive_steps(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("JSON serialization")?
        );
        return Ok(());
    }

    println!();
    if plan.is_converged() {
        app.output.success(&format!(
            "Converged; only the idempotent directory check would run for {}",
            describe_target(desired),
        ));
        println!();
        return Ok(());
    }

    app.output.header(&format!(
        "Plan for {} at {}",
        describe_target(desired),
        layout.root().display(),
    ));
    println!();
    for (idx, action) in plan.actions.iter().enumerate() {
        if action.is_destructive() {
            println!(
                "    {}. {}",
                idx + 1,
                action.style(app.output.styles.destructive)
            );
        } else {
            println!("    {}. {action}", idx + 1);
        }
    }
    println!();
    if plan.has_destructive_steps() {
        app.output
            .warn("Includes removal steps; existing binaries will be replaced");
    }
    Ok(())
}
