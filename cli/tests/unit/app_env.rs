//! Unit tests for environment-driven context flags and prompt suppression.

#![allow(clippy::expect_used)]
#![allow(unsafe_code)]

use std::path::PathBuf;

use serial_test::serial;
use warden_cli::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};

fn flags(yes: bool, quiet: bool) -> AppFlags {
    AppFlags {
        output: OutputFlags {
            no_color: true,
            quiet,
            json: false,
        },
        behaviour: BehaviourFlags { yes },
        // Point at a path that cannot exist so the ambient home config
        // never leaks into the test.
        config: Some(PathBuf::from("/nonexistent/warden-test/config.yaml")),
    }
}

#[test]
#[serial]
fn warden_yes_env_suppresses_prompts() {
    // SAFETY: env mutation is process-global; #[serial] keeps the tests
    // that touch it from interleaving.
    unsafe { std::env::set_var("WARDEN_YES", "1") };
    let app = AppContext::new(&flags(false, false)).expect("context");
    unsafe { std::env::remove_var("WARDEN_YES") };

    assert!(app.non_interactive);
}

#[test]
#[serial]
fn yes_flag_suppresses_prompts_without_env() {
    let app = AppContext::new(&flags(true, false)).expect("context");
    assert!(app.non_interactive);
}

#[test]
#[serial]
fn quiet_output_answers_prompts_with_the_default() {
    let app = AppContext::new(&flags(false, true)).expect("context");
    assert!(app.confirm("Continue?", true).expect("confirm"));
    assert!(!app.confirm("Continue?", false).expect("confirm"));
}

#[test]
#[serial]
fn missing_config_file_falls_back_to_defaults() {
    let app = AppContext::new(&flags(false, false)).expect("context");
    assert_eq!(
        app.config.source.base_url,
        warden_cli::domain::config::DEFAULT_BASE_URL
    );
    assert!(app.config.agent.variant.is_none());
}
