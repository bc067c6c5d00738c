//! Pushbridge CLI.
//!
//! Diagnostic entry point: formats notification payloads and replays recorded
//! callback traces through the bridge's managers.

fn main() {
    if let Err(err) = pushbridge_lib::cli::run() {
        eprintln!("pushbridge: {err}");
        std::process::exit(1);
    }
}
