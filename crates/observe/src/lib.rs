//! This crate contains the code required to observe the deployment tooling.
//! That includes initialization logic for logging and the panic hook that
//! routes panics through the log output.
pub mod config;
pub mod tracing;
