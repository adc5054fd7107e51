use tracing::Level;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// Installs the global subscriber. `RUST_LOG` wins over `level`. Output goes to
/// stderr; stdout is reserved for the regression report. Calling this twice is
/// harmless.
pub fn init(level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("graphbench={level},warn")));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true);
    let _ = Registry::default().with(env_filter).with(fmt_layer).try_init();
}
