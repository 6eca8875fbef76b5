//! Tracing subscriber setup for embedders and tests.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV_VAR: &str = "WEFT_LOG";

/// Installs a formatting subscriber filtered by `WEFT_LOG` (default:
/// `warn`). Safe to call more than once; later calls are no-ops.
pub fn init() {
    init_with_default_filter("warn");
}

pub fn init_with_default_filter(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
        .try_init();
}
