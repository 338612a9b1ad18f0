use configuration::{AppSettings, Environment};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set. Production logs are JSON lines. The returned
/// guard flushes buffered lines when dropped, so keep it alive in `main`.
pub fn init(settings: &AppSettings) -> anyhow::Result<WorkerGuard> {
    let default_directives = match settings.environment {
        Environment::Development => "debug,sqlx=info,hyper=info",
        _ => "info",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    let installed = if settings.environment == Environment::Production {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Cannot install the tracing subscriber: {e}"))?;

    Ok(guard)
}
