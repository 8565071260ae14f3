use anyhow::Context;
use eatery::{
    config::{AppConfig, DatabaseConfig},
    indexes::ensure_indexes,
    memory::InMemoryStore,
    routes,
    state::AppState,
    store::DocumentStore,
    telemetry,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = AppConfig::load().context("failed to load configuration")?;
    info!(addr = %config.server.socket_addr(), database = %config.database.name, "starting eatery");

    let store = connect(&config.database).await?;
    ensure_indexes(&store).await.context("failed to create indexes")?;

    let state = AppState::new(store.clone(), &config.auth).context("invalid auth configuration")?;
    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;

    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.shutdown().await?;
    info!("server shut down gracefully");

    Ok(())
}

#[cfg(feature = "mongodb")]
async fn connect(config: &DatabaseConfig) -> anyhow::Result<DocumentStore> {
    use eatery::{backend::StoreBackendBuilder, mongodb::MongoDbStore};

    match &config.mongodb_uri {
        Some(uri) => {
            let backend = MongoDbStore::builder(uri, &config.name)
                .build()
                .await
                .context("failed to connect to MongoDB")?;
            info!("using MongoDB backend");
            Ok(DocumentStore::new(backend))
        }
        None => Ok(in_memory()),
    }
}

#[cfg(not(feature = "mongodb"))]
async fn connect(config: &DatabaseConfig) -> anyhow::Result<DocumentStore> {
    if config.mongodb_uri.is_some() {
        anyhow::bail!("a MongoDB URI is configured but this build lacks the `mongodb` feature");
    }
    Ok(in_memory())
}

fn in_memory() -> DocumentStore {
    warn!("no MongoDB URI configured, using the in-memory backend; data is lost on exit");
    DocumentStore::new(InMemoryStore::new())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(%err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to install SIGTERM handler");
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

    info!("shutdown signal received");
}
