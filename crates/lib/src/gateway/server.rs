//! Gateway HTTP server: LINE webhook endpoint and health check.

use crate::channels::{verify_signature, LineChannel, WebhookPayload, SIGNATURE_HEADER};
use crate::config::RelayConfig;
use crate::llm::OpenAiClient;
use crate::relay::Relay;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

const OK_BODY: &str = "OK";
const INVALID_SIGNATURE_BODY: &str = "Invalid signature";
const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Shared state for the gateway (secret for signature checks, relay for outbound calls).
#[derive(Clone)]
pub struct GatewayState {
    /// LINE channel secret; HMAC key for X-Line-Signature.
    pub channel_secret: Arc<str>,
    pub relay: Relay,
    /// Port reported by the health check.
    pub port: u16,
}

impl GatewayState {
    pub fn new(channel_secret: impl Into<Arc<str>>, relay: Relay, port: u16) -> Self {
        Self {
            channel_secret: channel_secret.into(),
            relay,
            port,
        }
    }

    /// Build production clients (OpenAI + LINE) from resolved config.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let backend = OpenAiClient::new(
            config.completion_base_url.clone(),
            config.api_key.clone(),
            config.timeout,
        )
        .context("building completion client")?;
        let channel = LineChannel::new(
            config.channel_access_token.clone(),
            config.line_api_base.clone(),
            config.timeout,
        )
        .context("building LINE client")?;
        let relay = Relay::new(Arc::new(backend), Arc::new(channel), config.model.clone());
        Ok(Self::new(config.channel_secret.as_str(), relay, config.port))
    }
}

/// Routes: `POST /webhook` and `GET /` (health). A panicking handler answers 500 instead of dropping the connection.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", post(line_webhook))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    log::error!("webhook: handler panicked: {}", detail);
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
}

/// Run the gateway server; binds to config.bind:config.port and blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: RelayConfig) -> Result<()> {
    let state = GatewayState::from_config(&config)?;
    log::info!("relay: using model {}", state.relay.model());
    let app = router(state);

    let bind_addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST /webhook: verifies X-Line-Signature, then relays each text message before answering.
/// A missing header is a processing error (500); a present but wrong signature is 400.
/// Relay failures are logged and do not change the response.
async fn line_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let request_id = uuid::Uuid::new_v4();
    log::info!("webhook {}: received {} bytes", request_id, body.len());
    log::debug!(
        "webhook {}: body {}",
        request_id,
        String::from_utf8_lossy(&body)
    );

    let Some(signature) = headers.get(SIGNATURE_HEADER) else {
        log::error!(
            "webhook {}: error processing webhook: missing {} header",
            request_id,
            SIGNATURE_HEADER
        );
        return (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY);
    };
    let signature = signature.to_str().unwrap_or("");
    if signature.is_empty() || !verify_signature(&state.channel_secret, &body, signature) {
        log::error!(
            "webhook {}: invalid signature, check the channel secret",
            request_id
        );
        return (StatusCode::BAD_REQUEST, INVALID_SIGNATURE_BODY);
    }

    let payload = match WebhookPayload::parse(&body) {
        Ok(p) => p,
        Err(e) => {
            log::error!("webhook {}: error processing payload: {}", request_id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY);
        }
    };

    let report = state.relay.relay_payload(&payload).await;
    log::info!(
        "webhook {}: {} event(s), {} relayed, {} failed",
        request_id,
        payload.events.len(),
        report.relayed,
        report.failed
    );
    (StatusCode::OK, OK_BODY)
}

/// GET / returns a simple health JSON (for load balancers and uptime checks).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}
