use crate::config::Environment;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparseable.
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber: JSON lines in production, human-readable
/// output in development. Filtering follows `RUST_LOG`.
///
/// Thread names are always recorded. The host runs its sampling timer and
/// log relay on named threads, and those names are the only way to tell
/// their events apart.
pub fn setup_logging(environment: &Environment) {
    if let Err(e) = try_setup_logging(environment) {
        eprintln!("Logging already initialized: {e}");
    }
}

/// Like [`setup_logging`] but reports a second initialization instead of
/// printing it.
pub fn try_setup_logging(environment: &Environment) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match environment {
        Environment::Production => registry
            .with(
                fmt::layer()
                    .json()
                    .with_level(true)
                    .with_thread_names(true),
            )
            .try_init(),
        Environment::Development => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_names(true)
                    .with_ansi(true),
            )
            .try_init(),
    }
}
