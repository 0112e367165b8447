//! optracker main entrypoint.

use optracker::run;
use optracker::ui::messages::error;
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr so command output stays clean; RUST_LOG
    // raises the level.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run() {
        error(e);
        std::process::exit(1);
    }
}
