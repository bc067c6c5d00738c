//! CLI module for Pushbridge.
//!
//! A diagnostic front end: format raw notification payloads the way the
//! managers would, and replay recorded callback traces through the deferred
//! proxies to see which events come out and in what order.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;
pub use commands::replay::{ReplayFailure, ReplayReport, replay};

use crate::error::BridgeError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), BridgeError> {
    let cli = Cli::parse();
    cli.execute()
}
