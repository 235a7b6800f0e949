//! Tracing setup for the CLI.
//!
//! Logs go to stderr so `compile -o -` keeps stdout a clean document
//! stream. `STEPGRAPH_LOG` takes an `EnvFilter` directive and wins over
//! the verbosity flag.

use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "STEPGRAPH_LOG";

/// Level for a `-v` count.
pub fn level_for(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from(level_for(verbose)).into()));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
