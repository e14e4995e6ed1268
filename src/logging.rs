//! Logger setup for hosts, tools and tests.

use std::sync::Once;

static INIT: Once = Once::new();

/// Logger settings.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Filter in `RUST_LOG` syntax. `RUST_LOG` is used when unset, then `info`.
    pub filter: Option<String>,
    /// Capture output per test instead of writing to stderr.
    pub is_test: bool,
}

impl LoggingConfig {
    /// Settings for test binaries.
    pub fn test() -> Self {
        Self {
            filter: None,
            is_test: true,
        }
    }
}

/// Install `env_logger` once. Later calls do nothing, and a logger installed
/// by the host is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        if let Some(filter) = &config.filter {
            builder.parse_filters(filter);
        }
        builder.is_test(config.is_test);
        if builder.try_init().is_err() {
            log::debug!("logger already installed");
        }
    });
}
