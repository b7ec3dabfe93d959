//! HTTP front end for shadow testing.
//!
//! Every `POST /predict` is dispatched to the primary and shadow backends at
//! once and answered with the resulting verdict.
//!
//! Endpoints:
//! - `POST /predict` - body `{"request_id": "...", "data": {...}}`, returns a verdict
//! - `GET /health` - liveness check, returns `OK`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

use shadowtest_core::{
    record_verdict, Comparator, PredictPayload, ShadowDispatcher, ShadowError, Verdict,
};

/// State shared across handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: Arc<ShadowDispatcher>,
    pub comparator: Comparator,
}

impl AppState {
    pub fn new(dispatcher: ShadowDispatcher, comparator: Comparator) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            comparator,
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve_listener(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    info!(
        addr = %listener.local_addr()?,
        primary = %state.dispatcher.primary_name(),
        shadow = %state.dispatcher.shadow_name(),
        "shadowtestd listening"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn predict_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Verdict>, ApiError> {
    // Body must be JSON (else the extractor rejects it); its shape is ours to check.
    let payload = PredictPayload::from_value(body)?;

    let pair = state
        .dispatcher
        .run_shadow_test(payload.data, &payload.request_id)
        .await;
    let verdict = state.comparator.compare_pair(&pair);
    record_verdict(&verdict);

    Ok(Json(verdict))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Error type for request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Shadow(#[from] ShadowError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Shadow(ShadowError::InvalidRequest(_))
            | ApiError::Shadow(ShadowError::UnsupportedInputFormat(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Shadow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
