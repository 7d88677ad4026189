use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::RwLock;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use waves_rewards::{LedgerView, RewardError, RewardLedger};

use crate::rewards::{handle_rewards, handle_rewards_at_height};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<RewardLedger>>,
    pub start_time: Instant,
    pub node_id: String,
    pub req_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(ledger: Arc<RwLock<RewardLedger>>, node_id: impl Into<String>) -> Self {
        Self {
            ledger,
            start_time: Instant::now(),
            node_id: node_id.into(),
            req_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    node_id: String,
    uptime_secs: u64,
    height: u64,
    halted: bool,
    req_total: u64,
}

#[derive(Debug, Serialize)]
struct HeightResponse {
    height: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<RewardError> for ApiError {
    fn from(err: RewardError) -> Self {
        match err {
            RewardError::FeatureNotActivated { .. } | RewardError::InvalidVote { .. } => {
                Self::bad_request(err.to_string())
            }
            RewardError::HeightOutOfRange { .. } => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let app = build_router(Arc::new(state));
    let listener = bind_listener(addr).await?;
    info!(target: "rpc", addr = %listener.local_addr()?, "RPC server listening");
    axum::serve(listener, app)
        .await
        .context("RPC server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {addr}"))
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/blocks/height", get(handle_block_height))
        .route("/blockchain/rewards", get(handle_rewards))
        .route("/blockchain/rewards/:height", get(handle_rewards_at_height))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request();
    let ledger = state.ledger.read();

    Json(HealthResponse {
        status: if ledger.is_halted() { "halted" } else { "ok" },
        node_id: state.node_id.clone(),
        uptime_secs: state.uptime_seconds(),
        height: ledger.height(),
        halted: ledger.is_halted(),
        req_total,
    })
}

async fn handle_block_height(State(state): State<SharedState>) -> Json<HeightResponse> {
    state.record_request();
    Json(HeightResponse {
        height: state.ledger.read().height(),
    })
}
