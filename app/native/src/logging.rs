//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events. Hosts that have their own
//! subscriber simply skip [`init`]; the CLI calls it once at startup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::LoggingConfig;

/// Builds the filter: `RUST_LOG` wins, then `verbose`, then the configured level.
fn build_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("pushbridge_lib=trace,pushbridge=trace,info")
        } else {
            EnvFilter::try_new(&config.level).unwrap_or_else(|err| {
                eprintln!("pushbridge: invalid log level `{}`: {err}", config.level);
                EnvFilter::new("info")
            })
        }
    })
}

/// Installs a stderr fmt subscriber.
///
/// Returns `false` if a global subscriber was already installed, which makes
/// repeated calls harmless.
pub fn init(config: &LoggingConfig, verbose: bool) -> bool {
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true);

    tracing_subscriber::registry()
        .with(build_filter(config, verbose))
        .with(layer)
        .try_init()
        .is_ok()
}
