use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use campus_counsel_backend::core::{config, logging};
use campus_counsel_backend::server::router;
use campus_counsel_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = config::load().context("Failed to load configuration")?;
    logging::init();

    let state = AppState::initialize(settings).await?;

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(state.settings.server.port);
    let bind_addr = format!("0.0.0.0:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
