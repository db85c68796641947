//! Backend for an e-waste recycling assistant: classifies uploaded photos of
//! electronic devices with a pre-trained TensorFlow graph, enriches the
//! result with recycling guidance from a generative API (static table on
//! failure), and fronts a remote realtime database for community events.

use std::fs;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod error;
pub mod events;
pub mod ewaste;
pub mod model;
pub mod routes;
pub mod state;

use config::{Config, MAX_CONTENT_LENGTH};
use model::Model;
use routes::{
    analyze_handler, create_event_handler, get_events_handler, hello_handler,
    upload_handler, upload_options_handler,
};
use state::AppState;

pub async fn start_server() {
    let _ = dotenvy::dotenv();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();
    fs::create_dir_all(&config.upload_dir).expect("Failed to create upload directory");

    info!("Loading model from {}", config.model_path);
    let model = Model::new(&config.model_path).expect("Failed to load model");

    let state = AppState::new(config, model);

    let app = Router::new()
        .route("/", get(hello_handler))
        .route(
            "/upload",
            post(upload_handler).options(upload_options_handler),
        )
        .route("/analyze", get(analyze_handler))
        .route("/create_event", post(create_event_handler))
        .route("/get_events", get(get_events_handler))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_CONTENT_LENGTH))
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Listening on http://{address}");

    axum::Server::bind(&address.parse().expect("Invalid bind address"))
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("Server shut down");
}

async fn shutdown_signal() {
    let interrupt = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
