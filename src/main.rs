//! pasulol-core HTTP server.

use pasulol_core::{
    Core, CoreConfig, CoreConfigError, EmailSendError, RedisBackend, RedisBackendError,
    SmtpEmailSender,
};
use thiserror::Error;
use tokio::{
    net::TcpListener,
    signal::{
        ctrl_c,
        unix::{SignalKind, signal},
    },
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] CoreConfigError),

    #[error("store: {0}")]
    Store(#[from] RedisBackendError),

    #[error("mail relay: {0}")]
    Mail(#[from] EmailSendError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        error!(error = %e, "startup failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    info!("Loading configuration...");
    let config = CoreConfig::from_env()?;

    info!("Connecting to store...");
    let backend = RedisBackend::connect(&config).await?;
    let mailer = SmtpEmailSender::from_config(&config)?;

    let address = format!("0.0.0.0:{}", config.port);
    let core = Core::new(config, backend, mailer)?;
    let app = core.routes::<()>();

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
