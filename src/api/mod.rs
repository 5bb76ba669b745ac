//! REST API server for Recap.
//!
//! Provides HTTP endpoints for:
//! - Processing an uploaded recording or transcript
//! - Saving and re-processing the latest transcript
//! - Inspecting meeting history and the current context window

pub mod error;
pub mod routes;

use crate::pipeline::MeetingPipeline;
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Uploaded recordings can be large.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MeetingPipeline>,
    /// Cancelled on shutdown; requests derive child tokens from it.
    pub shutdown: CancellationToken,
}

pub struct ApiServer {
    port: u16,
    state: AppState,
}

impl ApiServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", get(status))
            .merge(routes::meetings::router(state.clone()))
            .merge(routes::history::router(state))
            .layer(
                ServiceBuilder::new()
                    .layer(CorsLayer::permissive())
                    .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
            )
    }

    pub async fn start(self) -> Result<()> {
        let shutdown = self.state.shutdown.clone();
        let app = Self::router(self.state);

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                     - Service info");
        info!("  POST /transcribe           - Process an uploaded recording or .txt transcript");
        info!("  POST /transcribe/from-file - Process the latest saved transcript");
        info!("  POST /save-transcript      - Save the latest transcript");
        info!("  GET  /get-transcript       - Read the latest transcript");
        info!("  GET  /history              - List meeting records");
        info!("  GET  /context              - Show the current context window");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "recap",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
