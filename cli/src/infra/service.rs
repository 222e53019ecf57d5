//! Service-manager infrastructure — implements `ServiceManager`.
//!
//! Linux hosts are managed through systemd, Windows hosts through the
//! native service control manager via PowerShell. Other platforms get a
//! clear error instead of a silent no-op.

use anyhow::{Context, Result, bail};

use crate::application::ports::{CommandRunner, ServiceEntry, ServiceManager};

/// Production `ServiceManager` backed by the host's native service
/// manager.
pub struct SystemServiceManager<R> {
    runner: R,
}

impl<R: CommandRunner> SystemServiceManager<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn query_systemd(&self, name: &str) -> Result<Option<ServiceEntry>> {
        let output = self
            .runner
            .run(
                "systemctl",
                &[
                    "show",
                    name,
                    "--no-pager",
                    "--property=LoadState,ActiveState,Description",
                ],
            )
            .await
            .context("running systemctl show")?;
        if !output.status.success() {
            bail!(
                "systemctl show exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(parse_systemd_show(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn control_systemd(&self, verb: &str, name: &str) -> Result<()> {
        let output = self
            .runner
            .run("systemctl", &[verb, name])
            .await
            .with_context(|| format!("running systemctl {verb}"))?;
        if !output.status.success() {
            bail!(
                "systemctl {verb} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn query_windows(&self, name: &str) -> Result<Option<ServiceEntry>> {
        let script = format!(
            "$s = Get-Service -Name '{name}' -ErrorAction SilentlyContinue; \
             if ($s) {{ $s.DisplayName; $s.Status }}"
        );
        let output = self.run_powershell(&script).await?;
        Ok(parse_powershell_service(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    async fn control_windows(&self, verb: &str, name: &str) -> Result<()> {
        let script = format!("{verb}-Service -Name '{name}' -ErrorAction Stop");
        self.run_powershell(&script).await?;
        Ok(())
    }

    async fn run_powershell(&self, script: &str) -> Result<std::process::Output> {
        let output = self
            .runner
            .run(
                "powershell",
                &["-NoProfile", "-NonInteractive", "-Command", script],
            )
            .await
            .context("running powershell")?;
        if !output.status.success() {
            bail!(
                "powershell exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }
}

fn unsupported_platform<T>() -> Result<T> {
    bail!(
        "No service manager integration for {}; agents are managed on \
         linux (systemd) and windows hosts only",
        std::env::consts::OS
    )
}

impl<R: CommandRunner> ServiceManager for SystemServiceManager<R> {
    async fn query(&self, name: &str) -> Result<Option<ServiceEntry>> {
        if cfg!(windows) {
            self.query_windows(name).await
        } else if cfg!(target_os = "linux") {
            self.query_systemd(name).await
        } else {
            unsupported_platform()
        }
    }

    async fn stop(&self, name: &str) -> Result<()> {
        if cfg!(windows) {
            self.control_windows("Stop", name).await
        } else if cfg!(target_os = "linux") {
            self.control_systemd("stop", name).await
        } else {
            unsupported_platform()
        }
    }

    async fn start(&self, name: &str) -> Result<()> {
        if cfg!(windows) {
            self.control_windows("Start", name).await
        } else if cfg!(target_os = "linux") {
            self.control_systemd("start", name).await
        } else {
            unsupported_platform()
        }
    }
}

/// Parse `systemctl show --property=LoadState,ActiveState,Description`
/// output into a service entry. `LoadState=not-found` means no unit
/// exists under the queried name.
fn parse_systemd_show(output: &str) -> Option<ServiceEntry> {
    let mut load_state = "";
    let mut active_state = "";
    let mut description = "";
    for line in output.lines() {
        if let Some((key, value)) = line.split_once('=') {
            match key {
                "LoadState" => load_state = value.trim(),
                "ActiveState" => active_state = value.trim(),
                "Description" => description = value.trim(),
                _ => {}
            }
        }
    }
    if load_state.is_empty() || load_state == "not-found" {
        return None;
    }
    Some(ServiceEntry {
        display_name: description.to_string(),
        running: active_state == "active",
    })
}

/// Parse the two-line `DisplayName` / `Status` output of the Get-Service
/// probe. Empty output means no service exists under the queried name.
fn parse_powershell_service(output: &str) -> Option<ServiceEntry> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
    let display_name = lines.next()?;
    let status = lines.next().unwrap_or_default();
    Some(ServiceEntry {
        display_name: display_name.to_string(),
        running: status.eq_ignore_ascii_case("running"),
    })
}
