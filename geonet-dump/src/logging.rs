//! Console logging.
//!
//! Log output goes to stderr so that the frame dump on stdout can be piped.

use std::io;

use chrono::Local;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging system.
///
/// `RUST_LOG` wins over `level`; `verbose` forces debug when neither is set.
pub fn init_logging(level: Option<&str>, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = match (verbose, level) {
        (true, _) => "debug",
        (false, Some(level)) => level,
        (false, None) => "info",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_timer(LocalTimeTimer),
    );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set default subscriber: {}", e))?;

    // geonet-protocol logs through the `log` facade
    tracing_log::LogTracer::init().map_err(|e| format!("Failed to initialize LogTracer: {}", e))?;

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct LocalTimeTimer;

impl fmt::time::FormatTime for LocalTimeTimer {
    fn format_time(&self, w: &mut fmt::format::Writer) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"))
    }
}
