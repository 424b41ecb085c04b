use habit_tracker::{ApiClient, AppState, Config, FileStorage, clock::SystemClock, router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    let mut storage = FileStorage::open(&config.data_path).await?;
    let writer = storage.take_writer();
    info!(path = %config.data_path.display(), "opened data store");

    let api = match &config.api_base_url {
        Some(url) => {
            let client = ApiClient::new(url.as_str(), config.api_timeout)?;
            info!(base_url = client.base_url(), "remote sync enabled");
            Some(client)
        }
        None => None,
    };

    let state = AppState::new(Box::new(storage), Arc::new(SystemClock), api);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = writer {
        if let Err(err) = writer.await {
            warn!("storage writer did not finish: {err}");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
