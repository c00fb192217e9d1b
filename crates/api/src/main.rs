use std::sync::Arc;

use anyhow::Context;

use authn_api::app::{self, AppServices};
use authn_api::config::AppConfig;
use authn_events::{EventSystem, LogNotifier, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    authn_observability::init();

    let config = AppConfig::from_env()?;

    let mut events = EventSystem::new(config.events.clone());
    handlers::register_all(&mut events, Arc::new(LogNotifier))?;
    events.init()?;
    let events = Arc::new(events);

    let services = Arc::new(AppServices::from_config(&config, events.clone()));
    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("system is closing, waiting for pending events");
    tokio::task::spawn_blocking(move || events.close()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
