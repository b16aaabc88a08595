//! Tooling & Integration Layer
//!
//! Command-line entry points over the orchestrator.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
