//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Converge Sentinel monitoring agents to their desired state
#[derive(Parser)]
#[command(
    name = "warden",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    // The `NO_COLOR` env var is honoured at runtime by `OutputContext` (any
    // value disables color); it is deliberately not bound via `env = ...`
    // here so an env-only value does not count as a provided argument and
    // defeat `arg_required_else_help`.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Assume yes for all prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Config file (defaults to ~/.warden/config.yaml)
    #[arg(long, global = true, value_name = "PATH", env = "WARDEN_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show observed and desired agent state on this host
    Status(commands::TargetArgs),

    /// Show the actions a converge run would execute
    Plan(commands::TargetArgs),

    /// Reconcile this host to the desired agent state
    Converge(commands::converge::ConvergeArgs),

    /// Reconcile every host in the fleet inventory
    Fleet(commands::fleet::FleetArgs),

    /// Check the release feed for a newer agent version
    Check(commands::TargetArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error when configuration loading or the command itself
    /// fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            config,
            command,
        } = self;

        let flags = AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
            config,
        };

        match command {
            Command::Version => commands::version::run(json),
            Command::Status(args) => commands::status::run(&AppContext::new(&flags)?, &args).await,
            Command::Plan(args) => commands::plan::run(&AppContext::new(&flags)?, &args).await,
            Command::Converge(args) => {
                commands::converge::run(&AppContext::new(&flags)?, &args).await
            }
            Command::Fleet(args) => commands::fleet::run(&AppContext::new(&flags)?, &args).await,
            Command::Check(args) => commands::check::run(&AppContext::new(&flags)?, &args).await,
        }
    }
}
