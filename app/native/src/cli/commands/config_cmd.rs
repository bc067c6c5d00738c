//! Config CLI commands.

use clap::Subcommand;

use crate::cli::output::print_highlighted_json;
use crate::config::{self, config_paths};
use crate::error::BridgeError;

/// Config management commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Show the path to the configuration file.
    ///
    /// Displays the paths where Pushbridge looks for configuration files,
    /// and indicates which one is currently in use (if any).
    Path,

    /// Print the effective configuration, defaults included.
    Show,
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cmd: &ConfigCommands) -> Result<(), BridgeError> {
    match cmd {
        ConfigCommands::Path => {
            show_config_path();
            Ok(())
        }
        ConfigCommands::Show => show_config(),
    }
}

fn show_config() -> Result<(), BridgeError> {
    let value = serde_json::to_value(config::get_config())?;
    if let Some(path) = config::get_config_path() {
        eprintln!("Loaded from {}", path.display());
    } else {
        eprintln!("No configuration file loaded, showing defaults");
    }
    print_highlighted_json(&value);
    Ok(())
}

fn show_config_path() {
    println!("Configuration file search paths (in priority order):\n");

    let mut found_config = false;

    for (i, path) in config_paths().iter().enumerate() {
        let exists = path.exists();
        let marker = if exists && !found_config {
            found_config = true;
            " (active)"
        } else if exists {
            " (exists)"
        } else {
            ""
        };

        println!("  {}. {}{}", i + 1, path.display(), marker);
    }

    if let Some(custom) = config::get_config_path() {
        println!("\nIn use: {}", custom.display());
    } else if !found_config {
        println!("\nNo configuration file found, defaults are in effect.");
    }
}
