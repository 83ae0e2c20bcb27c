pub mod utils;

use std::time::Duration;

use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;
use crate::http_server;
use crate::state::ServiceState;

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialize logging, panic handler, and build info reporting.
/// The returned guard must be kept alive for the duration of the program.
fn init_logging(config: &Config) -> tracing_appender::non_blocking::WorkerGuard {
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let env_filter = EnvFilter::builder()
        .with_default_directive(config.log_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stdout_layer).init();

    utils::register_panic_logger();
    utils::report_build_info();

    stdout_guard
}

/// A missing database file is fatal. Any other open failure is only logged,
/// `/_status/readyz` keeps reporting it.
fn check_database(state: &ServiceState) -> anyhow::Result<()> {
    let path = state.inspector().db_path();
    if !path.exists() {
        anyhow::bail!("database file does not exist: {}", path.display());
    }
    match state.inspector().probe() {
        Ok(()) => tracing::info!(db = %path.display(), "database opened"),
        Err(e) => tracing::warn!(db = %path.display(), "database is not readable yet: {}", e),
    }
    Ok(())
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let _guard = init_logging(&config);
    let state = ServiceState::from_config(&config);
    if let Err(e) = check_database(&state) {
        tracing::error!("{}", e);
        return Err(e);
    }

    let (graceful_waiter, shutdown_rx) = utils::graceful_shutdown_blocker()?;

    let server_config =
        http_server::Config::new(config.listen_addr, &config.db_path, config.log_level);
    let server = tokio::spawn(async move {
        if let Err(e) = http_server::run(server_config, state, shutdown_rx).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    let _ = graceful_waiter.await;

    if timeout(FINAL_SHUTDOWN_TIMEOUT, server).await.is_err() {
        anyhow::bail!(
            "failed to shut down within {} seconds",
            FINAL_SHUTDOWN_TIMEOUT.as_secs()
        );
    }
    Ok(())
}
