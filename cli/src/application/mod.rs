//! Application layer — use-cases composed from domain logic and ports.
//!
//! Services in this layer depend on `crate::domain` and the port traits in
//! `ports.rs` only. Infrastructure adapters are injected by the command
//! layer.

pub mod ports;
pub mod services;
