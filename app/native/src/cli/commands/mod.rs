//! CLI command definitions using Clap.
//!
//! - `config` - Configuration file commands
//! - `format` - Run a payload formatter over a JSON document
//! - `replay` - Replay a recorded callback trace through the managers

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::completion::FetchResult;
use crate::error::BridgeError;
use crate::{config, logging};

pub mod config_cmd;
pub mod format;
pub mod replay;

pub use config_cmd::ConfigCommands;
pub use format::FormatKind;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pushbridge CLI - diagnostics for the push-notification bridge.
#[derive(Parser, Debug)]
#[command(name = "pushbridge")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Log everything the bridge does to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Format a raw payload the way the bridge reports it to listeners.
    ///
    /// Reads a JSON document from a file, or from stdin when the path is `-`.
    #[command(after_long_help = r#"Examples:
  pushbridge format content-available payload.json
  pushbridge format legacy-remote --initial payload.json
  cat request.json | pushbridge format request -"#)]
    Format {
        /// Which formatter to run.
        #[arg(value_enum)]
        kind: FormatKind,

        /// Input file, or `-` for stdin.
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Mark the notification as the one that launched the app.
        #[arg(long)]
        initial: bool,

        /// Print compact JSON without colors.
        #[arg(long)]
        raw: bool,
    },

    /// Replay a JSON-lines trace of OS callbacks through the managers.
    ///
    /// Each line is `{ "manager": "...", "selector": "...", "args": ... }`.
    /// Managers are `contentAvailable`, `registration` and `userNotification`.
    /// Blank lines and lines starting with `//` are skipped.
    #[command(after_long_help = r#"Examples:
  pushbridge replay trace.jsonl
  pushbridge replay --attach-after 3 trace.jsonl
  pushbridge replay --finish new-data --json trace.jsonl"#)]
    Replay {
        /// Input file, or `-` for stdin.
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Activate the real managers after this many messages.
        ///
        /// Messages before that point queue in the proxies and are flushed on
        /// activation. Defaults to activating before the first message.
        #[arg(long, short, value_name = "N", default_value_t = 0)]
        attach_after: usize,

        /// Finish every silent notification with this fetch result.
        #[arg(long, value_name = "RESULT")]
        finish: Option<FetchResult>,

        /// Print events as JSON lines instead of highlighted output.
        #[arg(long)]
        json: bool,
    },

    /// Configuration file commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), BridgeError> {
        if let Some(path) = self.config_path() {
            if !path.exists() {
                return Err(BridgeError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config::set_custom_config_path(path);
        }

        let config = config::init();
        logging::init(&config.logging, self.verbose);

        match &self.command {
            Commands::Format { kind, input, initial, raw } => {
                let payload = read_json(input)?;
                format::execute(*kind, &payload, *initial, *raw)
            }
            Commands::Replay { input, attach_after, finish, json } => {
                let reader = open_input(input)?;
                replay::execute(reader, *attach_after, *finish, *json, config)
            }
            Commands::Config(cmd) => config_cmd::execute(cmd),
        }
    }
}

/// Opens `path` for line reading, with `-` meaning stdin.
fn open_input(path: &Path) -> Result<Box<dyn BufRead>, BridgeError> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).map_err(|err| {
        BridgeError::CommandError(format!("Failed to open {}: {err}", path.display()))
    })?;
    Ok(Box::new(BufReader::new(file)))
}

/// Reads a single JSON document from `path`, with `-` meaning stdin.
fn read_json(path: &Path) -> Result<serde_json::Value, BridgeError> {
    let reader = open_input(path)?;
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // CLI parsing tests
    // ========================================================================

    #[test]
    fn test_cli_parses_format() {
        let cli = Cli::try_parse_from(["pushbridge", "format", "content-available", "p.json"]).unwrap();
        match cli.command {
            Commands::Format { kind, input, initial, raw } => {
                assert_eq!(kind, FormatKind::ContentAvailable);
                assert_eq!(input, PathBuf::from("p.json"));
                assert!(!initial);
                assert!(!raw);
            }
            _ => panic!("Expected Format command"),
        }
    }

    #[test]
    fn test_cli_format_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["pushbridge", "format", "request"]).unwrap();
        match cli.command {
            Commands::Format { input, .. } => assert_eq!(input, PathBuf::from("-")),
            _ => panic!("Expected Format command"),
        }
    }

    #[test]
    fn test_cli_parses_replay_options() {
        let cli = Cli::try_parse_from([
            "pushbridge",
            "replay",
            "--attach-after",
            "3",
            "--finish",
            "new-data",
            "--json",
            "trace.jsonl",
        ])
        .unwrap();
        match cli.command {
            Commands::Replay { input, attach_after, finish, json } => {
                assert_eq!(input, PathBuf::from("trace.jsonl"));
                assert_eq!(attach_after, 3);
                assert_eq!(finish, Some(FetchResult::NewData));
                assert!(json);
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_fetch_result() {
        assert!(Cli::try_parse_from(["pushbridge", "replay", "--finish", "maybe"]).is_err());
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["pushbridge", "config", "path", "--config", "/tmp/c.json", "-v"])
            .unwrap();
        assert_eq!(cli.config_path(), Some(PathBuf::from("/tmp/c.json")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Config(ConfigCommands::Path)));
    }

    #[test]
    fn test_execute_rejects_missing_config_file() {
        let cli = Cli::try_parse_from([
            "pushbridge",
            "config",
            "path",
            "--config",
            "/nonexistent/pushbridge/config.json",
        ])
        .unwrap();
        assert!(matches!(cli.execute(), Err(BridgeError::ConfigError(_))));
    }

    #[test]
    fn test_read_json_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        std::fs::write(&path, r#"{"aps": {"content-available": 1}}"#).unwrap();
        let value = read_json(&path).unwrap();
        assert_eq!(value["aps"]["content-available"], 1);
    }

    #[test]
    fn test_open_input_missing_file() {
        let err = open_input(Path::new("/nonexistent/trace.jsonl")).err().unwrap();
        assert!(matches!(err, BridgeError::CommandError(_)));
    }
}
