//! Application context — unified state passed to every command handler.
//!
//! `AppContext` holds the output context, the loaded host configuration, and
//! the interactivity flags, so command handlers take one `&AppContext`
//! instead of a bag of loose parameters.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::config::{
    FleetInventory, WardenConfig, desired_from_parts, validate_inventory, validate_source,
};
use crate::domain::install::{InstallLayout, default_install_root};
use crate::domain::state::DesiredAgentState;
use crate::output::OutputContext;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `WARDEN_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
    /// Config file path override (`--config` / `WARDEN_CONFIG`).
    pub config: Option<PathBuf>,
}

/// Unified application context passed to every command handler.
///
/// Constructed once in `Cli::run()` and passed as `&AppContext` to all
/// command handlers.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Host configuration loaded from `~/.warden/config.yaml`.
    pub config: WardenConfig,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `WARDEN_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or fails validation.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("WARDEN_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            config: load_config(flags.config.as_deref())?,
            non_interactive,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Resolve the desired agent state, with CLI flags taking precedence
    /// over the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the variant or version string is invalid.
    pub fn desired(
        &self,
        variant: Option<&str>,
        version: Option<&str>,
    ) -> Result<DesiredAgentState> {
        desired_from_parts(
            variant.or(self.config.agent.variant.as_deref()),
            version.or(self.config.agent.version.as_deref()),
        )
    }

    /// Resolve the install layout, with CLI flags taking precedence over the
    /// configuration file and the platform default as the fallback root.
    #[must_use]
    pub fn layout(&self, install_root: Option<&Path>, instance: Option<&str>) -> InstallLayout {
        let root = install_root
            .map(Path::to_path_buf)
            .or_else(|| self.config.install_root.clone())
            .unwrap_or_else(default_install_root);
        InstallLayout::with_instance(root, instance.map(str::to_string))
    }

    /// Ask the user for confirmation.
    ///
    /// Returns `default` without prompting when `non_interactive` is `true`
    /// (CI, `--yes` flag, or `WARDEN_YES` env), when output is quiet, or
    /// when stdout is not a terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails.
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive || self.output.quiet || !self.output.is_tty {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}

// ── Config files ─────────────────────────────────────────────────────────────

/// Path of the host configuration file.
///
/// The `--config` flag (or `WARDEN_CONFIG` env, resolved by clap) wins;
/// the default is `~/.warden/config.yaml`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_path(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(".warden").join("config.yaml"))
}

/// Default path of the fleet inventory file (`~/.warden/fleet.yaml`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_inventory_path() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(".warden").join("fleet.yaml"))
}

/// Load the host configuration, falling back to defaults when the file does
/// not exist.
fn load_config(flag: Option<&Path>) -> Result<WardenConfig> {
    let path = config_path(flag)?;
    if !path.exists() {
        return Ok(WardenConfig::default());
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: WardenConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    validate_source(&config.source)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Load and validate a fleet inventory file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails inventory
/// validation (duplicate hosts, invalid pins, zero download slots).
pub fn load_inventory(path: &Path) -> Result<FleetInventory> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading fleet inventory {}", path.display()))?;
    let inventory: FleetInventory = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing fleet inventory {}", path.display()))?;
    validate_inventory(&inventory)?;
    Ok(inventory)
}
