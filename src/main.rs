use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use movie_review_api::{
    config::Config,
    db::{create_pool, MemoryStore, PgStore, Store},
    routes::{create_router, AppState},
    services::{import, SessionKeys},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("movie_review_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(
            create_pool(url, config.database_max_connections).await?,
        )),
        None => {
            tracing::warn!("DATABASE_URL not set, keeping all data in memory");
            Arc::new(MemoryStore::new())
        }
    };

    if let Some(path) = &config.catalog_seed {
        let movies = import::load_seed_file(path)?;
        import::import_catalog(store.as_ref(), &movies).await?;
    }

    let state = AppState::new(
        store,
        SessionKeys::new(&config.session_secret, config.session_ttl_secs),
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
