use arena_server::config::ServerConfig;
use arena_server::engine::Engine;
use arena_server::ws::{router, AppState};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    config.validate()?;

    let listen_addr = config.listen_addr.clone();
    let engine = Engine::new(config);
    let tick_loop = engine.start();

    let app = router(AppState::new(engine.clone())).layer(CorsLayer::permissive());

    tracing::info!("Starting arena server on {}", listen_addr);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    let shutdown_engine = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown_engine.shutdown();
        })
        .await?;

    let _ = tick_loop.await;
    Ok(())
}
