//! Unit tests for the warden CLI.
//!
//! These tests drive the application services with stub ports and run fast
//! without external I/O.

mod app_env;
mod architecture;
mod fleet_throttle;
mod observe_service;
mod property_tests;
