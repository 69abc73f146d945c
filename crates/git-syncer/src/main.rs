//! git-syncer binary.

use std::sync::Arc;

use anyhow::Context;
use git_syncer::{Application, Secrets, Settings, logging, metrics};
use syncer_git::GitCli;
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    let secrets = Secrets::new();
    let settings = Settings::load(&secrets).context("Failed to load settings")?;

    logging::init(&settings.logs, secrets).context("Failed to initialize logging")?;
    info!("Starting git-syncer v{}", git_syncer::version());

    settings.app.warn_if_debug_outside_development();
    if settings.app.is_debug() {
        info!("Debug mode is enabled");
    }

    let close_timeout = settings.scheduler.close_timeout();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    let result = runtime.block_on(run(settings));

    // Workers stuck in blocking git calls must not hold the process open.
    runtime.shutdown_timeout(close_timeout);
    result
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    if let Some(listen) = settings.metrics.listen {
        metrics::init_metrics(listen).context("Failed to initialize metrics")?;
    }

    let app = Application::from_settings(settings, Arc::new(GitCli::new()))
        .context("Failed to initialize application")?;

    let result = tokio::select! {
        result = app.start() => result,
        _ = shutdown_signal() => {
            info!("Application has been interrupted");
            Ok(())
        },
    };

    let disposed = app.dispose().await;
    if disposed.is_err() {
        warn!("Abandoning workers still running after shutdown");
    }

    result.context("Application runtime error")?;
    disposed.context("Failed to shut down")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
