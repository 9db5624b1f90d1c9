//! Tooling & Integration Layer
//!
//! CLI commands, text formatting, and the line-delimited JSON `serve` loop
//! that exposes the core API to a host process.

pub mod cli;
pub mod format;
pub mod serve;

pub use cli::{AgentCommands, Cli, CliContext, Commands};
pub use serve::{serve, ServeRequest};
