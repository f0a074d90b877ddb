//! Logging initialization

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::Result;

/// Log to stderr. `RUST_LOG` takes precedence over `debug`.
pub fn init_logging(debug: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(debug)))
        .map_err(|e| format!("Failed to create log filter: {e}"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| format!("Failed to install logger: {e}"))?;
    Ok(())
}

fn default_directives(debug: bool) -> String {
    let level = if debug { "debug" } else { "warn" };
    format!("indi_client={level},indi_probe={level}")
}
