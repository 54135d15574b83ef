use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt};
use std::sync::OnceLock;

use crate::config::{LogFormat, LoggingConfig};

static LOG_INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber once; later calls are no-ops.
pub fn setup_logging(config: &LoggingConfig) {
    LOG_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.filter));

        let registry = tracing_subscriber::registry().with(filter);

        let result = match config.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .try_init(),
            LogFormat::Text => registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .try_init(),
        };

        // another subscriber (e.g. a test harness) already owns the global slot
        if let Err(err) = result {
            eprintln!("logging already initialised: {}", err);
        }
    });
}

#[macro_export]
macro_rules! log_invocation {
    ($level:ident, $session:expr, $($arg:tt)*) => {
        tracing::$level!(
            target: "invocation",
            session_id = $session,
            $($arg)*
        );
    };
}

#[macro_export]
macro_rules! log_tool {
    ($level:ident, $tool:expr, $($arg:tt)*) => {
        tracing::$level!(
            target: "tool",
            tool = $tool,
            $($arg)*
        );
    };
}
