//! Parley server library logic.

pub mod api_ws;
pub mod config;

use axum::{routing::get, Extension, Json, Router};
use parley_voice::VoiceServices;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Remote engines and turn settings, shared by every connection.
    pub services: Arc<VoiceServices>,
    /// Parent directory for per-connection scratch directories.
    pub scratch_root: PathBuf,
    /// Browser client assets, served at `/` when the directory exists.
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(services: VoiceServices, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            services: Arc::new(services),
            scratch_root: scratch_root.into(),
            static_dir: None,
        }
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/ws", get(api_ws::ws_handler));

    let router = match state.static_dir.as_deref() {
        Some(dir) if dir.join("index.html").exists() => {
            tracing::info!(path = %dir.display(), "serving client static files");
            router.fallback_service(
                ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
            )
        }
        Some(dir) if dir.is_dir() => {
            tracing::info!(path = %dir.display(), "serving static files without index fallback");
            router.fallback_service(ServeDir::new(dir))
        }
        Some(dir) => {
            tracing::info!(path = %dir.display(), "static directory not found, skipping static file serving");
            router
        }
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
