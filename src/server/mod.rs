//! HTTP surface: the Progress Channel WebSocket, artifact retrieval and
//! liveness.

pub mod protocol;
pub mod session;

use crate::config::Config;
use crate::error::{PodcastError, Result};
use crate::pipeline::{Pipeline, PipelineConfig, VoiceId};
use crate::store::ArtifactStore;
use crate::upstream::Upstreams;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use protocol::{AUDIO_NOT_FOUND, AudioResponse, ErrorResponse, HealthResponse};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build the router. With `cors` set, any origin may call every endpoint.
pub fn router(state: AppState, cors: bool) -> Router {
    let app = Router::new()
        .route("/ws/generate", get(ws_handler))
        .route("/audio/{id}", get(audio_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| session::handle_socket(socket, state.pipeline))
}

async fn audio_handler(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    match state.pipeline.store().get(&id) {
        Some(bytes) => Json(AudioResponse {
            audio: BASE64.encode(&bytes),
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(AUDIO_NOT_FOUND)),
        )
            .into_response(),
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Build the production pipeline from configuration.
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let upstreams = Upstreams::from_config(config)?;
    Ok(Pipeline::new(
        upstreams,
        Arc::new(ArtifactStore::new()),
        PipelineConfig {
            host_voice: VoiceId::new(&config.minimax.host_voice_id),
        },
    ))
}

/// Run the server until SIGINT or SIGTERM.
pub async fn run_server(config: Config) -> Result<()> {
    config.validate()?;
    for key in config.missing_credentials() {
        tracing::warn!(key, "credential not configured; runs will fail when they reach it");
    }

    let state = AppState::new(build_pipeline(&config)?);
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| PodcastError::Server {
            message: format!("Failed to bind {}: {}", config.server.bind, e),
        })?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, version = %crate::version_string(), "server listening");

    axum::serve(listener, router(state, config.server.cors))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::warn!(error = %e, "failed to listen for SIGINT");
            }
            tracing::info!("received SIGINT, shutting down");
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                tracing::warn!(error = %e, "failed to set up SIGTERM handler");
            }
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| PodcastError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<Result<()>>().await
}
