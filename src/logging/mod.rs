pub mod ndjson;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Reads per-target levels from `HABITLEDGER_LOG`, for example
/// `HABITLEDGER_LOG=habitledger::migrations=debug`. Falls back to
/// `habitledger=info`. Output goes to stderr so command output stays clean.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("HABITLEDGER_LOG")
            .unwrap_or_else(|_| EnvFilter::new("habitledger=info"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}
