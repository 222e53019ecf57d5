//! Check command — compare this host against the latest published release.

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::BinaryInspector;
use crate::application::services::release::{ReleaseCheck, check_release};
use crate::commands::{HostStack, TargetArgs};
use crate::infra::release::HttpReleaseResolver;
use crate::output::progress;

/// Run `warden check`.
///
/// # Errors
///
/// Returns an error when the installed binary cannot be inspected or the
/// release feed cannot be reached.
pub async fn run(app: &AppContext, args: &TargetArgs) -> Result<ExitCode> {
    let desired = app.desired(args.agent.as_deref(), args.agent_version.as_deref())?;
    let layout = app.layout(args.install_root.as_deref(), args.instance.as_deref());
    let stack = HostStack::new();

    let installed = stack
        .inspector
        .stat_version(&layout.executable(desired.variant))
        .await?;

    let resolver = HttpReleaseResolver::new(&app.config.source);
    let check = if app.is_json() || !app.output.show_progress() {
        check_release(&resolver, desired.version.clone(), installed).await?
    } else {
        let pb = progress::spinner("Checking the release feed");
        match check_release(&resolver, desired.version.clone(), installed).await {
            Ok(check) => {
                progress::finish_ok(&pb, &format!("Latest release is {}", check.latest));
                check
            }
            Err(e) => {
                progress::finish_error(&pb, "Release feed unreachable");
                return Err(e);
            }
        }
    };

    if app.is_json() {
        let out = serde_json::json!({
            "agent": desired.variant.label(),
            "latest": check.latest.to_string(),
            "pinned": check.pinned.as_ref().map(ToString::to_string),
            "installed": check.installed.as_ref().map(ToString::to_string),
            "update_available": check.update_available(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("JSON serialization")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    app.output.kv("Agent:    ", desired.variant.label());
    app.output.kv("Latest:   ", &check.latest.to_string());
    if let Some(pinned) = &check.pinned {
        app.output.kv("Pinned:   ", &pinned.to_string());
    }
    app.output.kv(
        "Installed:",
        &check
            .installed
            .as_ref()
            .map_or_else(|| "not installed".to_string(), ToString::to_string),
    );
    println!();

    if check.update_available() {
        app.output.warn(&update_hint(&check));
    } else {
        app.output.success("Up to date");
    }
    println!();

    Ok(ExitCode::SUCCESS)
}

/// Warning text with the converge invocation that would apply the update.
fn update_hint(check: &ReleaseCheck) -> String {
    format!(
        "Update available: {}\n    Run: warden converge --agent-version {}",
        check.latest, check.latest,
    )
}
