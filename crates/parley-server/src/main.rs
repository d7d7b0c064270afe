//! Parley server binary: the voice relay entry point.
//!
//! Starts an axum HTTP server with structured logging, the remote speech and
//! language engines, and graceful shutdown on SIGTERM/SIGINT.

use parley_server::config;
use parley_server::{app, AppState};
use parley_voice::VoiceServices;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("PARLEY_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv().ok();

    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        dotenv = dotenv.as_ref().map(|p| p.display().to_string()).as_deref().unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    config
        .validate()
        .expect("invalid configuration: set GROQ_API_KEY in the environment or .env");

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client");

    tracing::info!(
        stt_model = %config.transcription.model,
        chat_model = %config.chat.model,
        voice = %config.synthesis.voice,
        speed = config.synthesis.speed,
        tts_url = %config.synthesis.base_url,
        search_enabled = config.search.is_enabled(),
        "voice engines configured"
    );
    if !config.search.is_enabled() {
        tracing::warn!("PERPLEXITY_API_KEY not set, web search is disabled");
    }

    let services = VoiceServices::from_config(
        client,
        config.transcription.clone(),
        config.chat.clone(),
        config.search.clone(),
        config.synthesis.clone(),
    );
    let scratch_root = config.scratch.root();
    std::fs::create_dir_all(&scratch_root)
        .expect("failed to create scratch root: check scratch.dir in config");

    // Build application
    let state = AppState::new(services, scratch_root)
        .with_static_dir(config.server.static_dir.clone());
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting parley server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    tracing::info!("parley server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
