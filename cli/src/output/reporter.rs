//! `ProgressReporter` implementations for the terminal.
//!
//! Application services emit progress events through the
//! `application::ports::ProgressReporter` trait; these types render them
//! without the services depending on any presentation type directly.

use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::OutputContext;

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `step()` prints `"  → {message}"` (suppressed when `ctx.quiet`)
/// - `success()` prints `"  ✓ {message}"` (suppressed when `ctx.quiet`)
/// - `warn()` prints `"  ! {message}"` (suppressed when `ctx.quiet`)
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if !self.ctx.quiet {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        if !self.ctx.quiet {
            println!("  {} {message}", "✓".style(self.ctx.styles.success));
        }
    }

    fn warn(&self, message: &str) {
        if !self.ctx.quiet {
            println!("  {} {message}", "!".style(self.ctx.styles.warning));
        }
    }
}

/// Reporter for fleet runs: prefixes every line with the host name so
/// interleaved output from concurrent hosts stays attributable. Uncolored;
/// fleet lines are meant for scanning and piping.
pub struct PrefixedReporter {
    prefix: String,
    quiet: bool,
}

impl PrefixedReporter {
    #[must_use]
    pub fn new(host: &str, quiet: bool) -> Self {
        Self {
            prefix: host.to_string(),
            quiet,
        }
    }
}

impl ProgressReporter for PrefixedReporter {
    fn step(&self, message: &str) {
        if !self.quiet {
            println!("  [{}] → {message}", self.prefix);
        }
    }

    fn success(&self, message: &str) {
        if !self.quiet {
            println!("  [{}] ✓ {message}", self.prefix);
        }
    }

    fn warn(&self, message: &str) {
        if !self.quiet {
            println!("  [{}] ! {message}", self.prefix);
        }
    }
}

/// Reporter that swallows every event. Used in JSON output mode, where
/// stdout must carry only the payload.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn step(&self, _message: &str) {}

    fn success(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}
}
