//! Version command

use std::process::ExitCode;

use anyhow::Result;

/// Run the version command.
///
/// # Errors
///
/// Infallible; the `Result` keeps the signature uniform with the other
/// commands.
pub fn run(json: bool) -> Result<ExitCode> {
    let version = env!("CARGO_PKG_VERSION");

    if json {
        println!(r#"{{"version":"{version}"}}"#);
    } else {
        println!("warden {version}");
    }
    Ok(ExitCode::SUCCESS)
}
