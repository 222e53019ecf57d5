//! Converge command — reconcile this host to the desired agent state.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ProgressReporter;
use crate::application::services::converge::{
    ConvergeContext, ConvergenceReport, ensure_agent_running, execute_plan,
};
use crate::application::services::fleet::DownloadThrottle;
use crate::commands::{HostStack, TargetArgs, describe_target, plan};
use crate::domain::plan::ConvergencePlan;
use crate::infra::archive::TarGzExtractor;
use crate::infra::fetch::HttpPackageFetcher;
use crate::output::reporter::{SilentReporter, TerminalReporter};

/// Arguments for the converge command.
#[derive(Args)]
pub struct ConvergeArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Show the plan without executing it
    #[arg(long)]
    pub check: bool,
}

/// Run `warden converge`.
///
/// Observes the host, computes the plan, asks for confirmation when the
/// plan removes anything, then executes it and makes sure the target
/// service ends up running.
///
/// # Errors
///
/// Returns an error when observation, release resolution, or any plan
/// action fails. Partial state is left for the next run to repair.
pub async fn run(app: &AppContext, args: &ConvergeArgs) -> Result<ExitCode> {
    let desired = app.desired(
        args.target.agent.as_deref(),
        args.target.agent_version.as_deref(),
    )?;
    let layout = app.layout(
        args.target.install_root.as_deref(),
        args.target.instance.as_deref(),
    );
    let stack = HostStack::new();

    let (desired, pending) = plan::compute(app, &stack, &layout, desired).await?;

    if args.check {
        plan::render_plan(app, &layout, &desired, &pending)?;
        return Ok(ExitCode::SUCCESS);
    }
    if !app.is_json() {
        plan::render_plan(app, &layout, &desired, &pending)?;
    }

    if pending.has_destructive_steps()
        && !app.non_interactive
        && !app.confirm("Continue?", false)?
    {
        if app.is_json() {
            println!("{}", serde_json::json!({ "cancelled": true }));
        } else {
            app.output.warn("Cancelled; host left unchanged");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = ConvergeContext {
        layout: &layout,
        desired: &desired,
        source: &app.config.source,
    };
    let report = if app.is_json() {
        execute(app, &stack, &ctx, &pending, &SilentReporter).await?
    } else {
        execute(
            app,
            &stack,
            &ctx,
            &pending,
            &TerminalReporter::new(&app.output),
        )
        .await?
    };

    render_report(app, &ctx, &report)?;
    Ok(ExitCode::SUCCESS)
}

/// Execute the plan with local adapters and ensure the agent is running.
async fn execute(
    app: &AppContext,
    stack: &HostStack,
    ctx: &ConvergeContext<'_>,
    plan: &ConvergencePlan,
    reporter: &impl ProgressReporter,
) -> Result<ConvergenceReport> {
    // A single-host run downloads at most one package.
    let throttle = DownloadThrottle::new(1);
    let quiet = app.is_json() || !app.output.show_progress();
    let fetcher = HttpPackageFetcher::new(ctx.source, throttle, quiet)?;
    let extractor = TarGzExtractor;

    let report = execute_plan(
        ctx,
        plan,
        &stack.services,
        &stack.runner,
        &stack.fs,
        &fetcher,
        &extractor,
        reporter,
    )
    .await?;
    ensure_agent_running(ctx, &report, &stack.services, reporter).await?;
    Ok(report)
}

/// Render the final convergence report.
fn render_report(
    app: &AppContext,
    ctx: &ConvergeContext<'_>,
    report: &ConvergenceReport,
) -> Result<()> {
    if app.is_json() {
        let out = serde_json::json!({
            "install_root": ctx.layout.root(),
            "desired": {
                "variant": ctx.desired.variant.label(),
                "version": ctx.desired.version.as_ref().map(ToString::to_string),
            },
            "changed": report.changed,
            "actions": report
                .outcomes
                .iter()
                .map(|o| {
                    serde_json::json!({
                        "action": o.action.name(),
                        "variant": o.action.variant().map(|v| v.label()),
                        "changed": o.changed,
                    })
                })
                .collect::<Vec<_>>(),
            "finished_at": report.finished_at.to_rfc3339(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("JSON serialization")?
        );
        return Ok(());
    }

    println!();
    if report.changed {
        let changes = report.outcomes.iter().filter(|o| o.changed).count();
        let noun = if changes == 1 { "change" } else { "changes" };
        app.output.success(&format!(
            "Converged to {}; {changes} {noun} applied",
            describe_target(ctx.desired),
        ));
    } else {
        app.output.success("Already converged; nothing changed");
    }
    println!();
    Ok(())
}
