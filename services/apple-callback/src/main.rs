//! Sign in with Apple callback service
//!
//! Single-binary Rust service that:
//! 1. Accepts the authorization code the frontend receives from Apple
//! 2. Exchanges it at Apple's token endpoint with a freshly minted client secret
//! 3. Relays a normalized auth record to the upstream account service
//! 4. Answers the frontend with JSON or a redirect to its landing page

mod auth_request;
mod backend;
mod callback;
mod config;
mod error;
mod metrics;
mod redirect;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header::{
    ACCEPT, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, CONTENT_TYPE,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::auth_request::CallbackRequest;
use crate::callback::CallbackState;
use crate::config::Config;

/// Non-secret settings echoed by the health endpoints
#[derive(Clone)]
struct ConfigSummary {
    client_id: String,
    redirect_uri: String,
    backend_url: Option<String>,
}

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    callback: CallbackState,
    summary: Arc<ConfigSummary>,
    /// Settings missing at startup; non-empty turns health checks into 500s
    missing_settings: Arc<Vec<String>>,
    prometheus: PrometheusHandle,
}

impl AppState {
    fn from_config(config: &Config, prometheus: PrometheusHandle) -> Self {
        Self {
            callback: CallbackState {
                client: reqwest::Client::new(),
                provider: Arc::new(config.provider()),
                provider_timeout: config.apple_timeout(),
                backend_url: config.backend.url.clone(),
                backend_timeout: config.backend_timeout(),
                frontend_url: config.frontend.url.clone(),
                response_mode: config.frontend.response_mode,
            },
            summary: Arc::new(ConfigSummary {
                client_id: config.apple.client_id.clone(),
                redirect_uri: config.apple.redirect_uri.clone(),
                backend_url: config.backend.url.clone(),
            }),
            missing_settings: Arc::new(config.missing_settings()),
            prometheus,
        }
    }
}

const CORS_ALLOW_HEADERS: &str = "Content-Type, Accept";
const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// Preflights short-circuit with 200. Ordinary responses only get the
/// origin header from here; `build_router` adds the other two.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
}

/// Build the axum router with all routes and shared state.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route(
            "/",
            get(root_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed),
        )
        .route(
            "/test",
            get(test_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed),
        )
        .route("/metrics", get(metrics_handler).fallback(method_not_allowed))
        .route(
            "/auth/apple/callback",
            post(callback_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed),
        )
        .fallback(fallback_handler)
        .layer(cors_layer())
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting apple-callback");

    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    match &config_path {
        Some(path) => info!(path = %path.display(), "loading configuration"),
        None => info!("no config file, using environment only"),
    }

    let config = Config::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load config from environment".to_string(),
    })?;

    info!(
        listen_addr = %config.server.listen_addr,
        client_id = %config.apple.client_id,
        redirect_uri = %config.apple.redirect_uri,
        backend_url = ?config.backend.url,
        frontend_url = %config.frontend.url,
        response_mode = ?config.frontend.response_mode,
        "configuration loaded"
    );
    for missing in config.missing_settings() {
        warn!(setting = %missing, "required setting missing, callbacks will fail");
    }

    let listen_addr = config.server.listen_addr;
    let app = build_router(
        AppState::from_config(&config, prometheus_handle),
        config.server.max_connections,
    );

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

fn configuration_error(missing: &[String]) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(serde_json::json!({
            "message": "Server configuration error",
            "errors": missing,
        })),
    )
        .into_response()
}

/// GET / health check
async fn root_handler(State(state): State<AppState>) -> Response {
    if !state.missing_settings.is_empty() {
        return configuration_error(&state.missing_settings);
    }
    axum::Json(serde_json::json!({
        "message": "Apple auth service is running",
        "config": {
            "client_id": state.summary.client_id,
            "redirect_uri": state.summary.redirect_uri,
            "backend_url": state.summary.backend_url,
        },
    }))
    .into_response()
}

/// GET /test liveness probe with server time
async fn test_handler(State(state): State<AppState>) -> Response {
    if !state.missing_settings.is_empty() {
        return configuration_error(&state.missing_settings);
    }
    axum::Json(serde_json::json!({
        "message": "Server is working",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "client_id": state.summary.client_id,
            "redirect_uri": state.summary.redirect_uri,
            "backend_url": state.summary.backend_url,
        },
    }))
    .into_response()
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.prometheus.render(),
    )
}

/// POST /auth/apple/callback
async fn callback_handler(
    State(state): State<AppState>,
    payload: Result<axum::Json<CallbackRequest>, JsonRejection>,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let payload = payload
        .map(|axum::Json(body)| body)
        .map_err(Into::into);
    callback::handle(&state.callback, payload, request_id).await
}

/// Bare OPTIONS without CORS request headers still gets a 200.
async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        axum::Json(serde_json::json!({
            "message": "Method Not Allowed",
            "allowed": ["GET", "POST", "OPTIONS"],
        })),
    )
        .into_response()
}

async fn fallback_handler(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    method_not_allowed().await
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
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
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
