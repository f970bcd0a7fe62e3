//! Demo server: loads settings from `STA_*` env (and `.env`), seeds the in-memory backend from a
//! fixture, mounts common and SensorThings routes.
//!
//! `cargo run --example server`, then `curl localhost:8000/sensorthings/v1.1/Things?$expand=Locations`.

use axum::Router;
use sensorthings_sdk::{common_routes_with_ready, load_from_env, sensorthings_routes, AppState, MemoryBackend};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const SAMPLE_FIXTURE: &str = include_str!("../fixtures/sample.json");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sensorthings_sdk=info")),
        )
        .init();

    let settings = load_from_env()?;
    let backend = match std::env::var("STA_FIXTURE") {
        Ok(path) => MemoryBackend::from_fixture_str(&tokio::fs::read_to_string(&path).await?, settings.id_type.clone())?,
        Err(_) => MemoryBackend::from_fixture_str(SAMPLE_FIXTURE, settings.id_type.clone())?,
    };
    tracing::info!(api_root = %settings.api_root(), "settings loaded");
    let state = AppState::new(Arc::new(backend), settings);

    let app = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(sensorthings_routes(state));

    let bind = std::env::var("STA_BIND").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
