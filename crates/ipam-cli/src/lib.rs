//! Deployment IPAM CLI
//!
//! Operator commands for reserving, releasing and inspecting the IPs of a
//! deployment's networks.

pub mod commands;
pub mod context;
pub mod output;

pub use context::CliContext;
pub use output::{render, OutputFormat, Render};
