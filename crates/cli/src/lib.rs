//! Command-line front end for table placement.
//!
//! Provides commands for:
//! - Generating a table configuration for a scenario file
//! - Validating a placement request without assigning anything
//! - Summing the server usage of existing table configurations

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult, Scenario};
pub use config::CliConfig;
