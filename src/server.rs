//! HTTP server exposing the affect inference endpoints.
//!
//! Routes:
//! - `POST /predict` scores a heart-rate / EDA sample
//! - `GET /health` always reports healthy
//! - `POST /compare` compares a predicted state with a self-report
//! - `GET /stats` returns inference counters
//!
//! # Architecture
//!
//! ```text
//! client ──→ POST /predict ──→ features ──→ models ──→ rescale
//! ```
//!
//! Models are loaded once when the server state is built and never reloaded.

use crate::config::Config;
use crate::core::{
    compare as compare_points, AffectPoint, AffectPredictor, AffectResult, ComparisonResult,
    PhysiologicalSample, RngNoise,
};
use crate::stats::{InferenceStats, SharedInferenceStats, StatsSnapshot};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: String,
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Persisted arousal model
    pub arousal_model_path: PathBuf,
    /// Persisted valence model
    pub valence_model_path: PathBuf,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(
        host: impl Into<String>,
        port: u16,
        arousal_model_path: PathBuf,
        valence_model_path: PathBuf,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            arousal_model_path,
            valence_model_path,
        }
    }
}

impl From<&Config> for ServerConfig {
    fn from(config: &Config) -> Self {
        Self::new(
            config.host.clone(),
            config.port,
            config.arousal_model_path.clone(),
            config.valence_model_path.clone(),
        )
    }
}

/// Shared server state
pub struct ServerState {
    /// Arousal/valence models, read-only after startup
    predictor: AffectPredictor,
    /// Request counters
    stats: SharedInferenceStats,
}

impl ServerState {
    /// Load models and create server state
    pub fn new(config: &ServerConfig) -> Self {
        let predictor = AffectPredictor::load_or_fallback(
            &config.arousal_model_path,
            &config.valence_model_path,
        );
        Self::with_predictor(predictor)
    }

    /// Create server state around an existing predictor
    pub fn with_predictor(predictor: AffectPredictor) -> Self {
        Self {
            predictor,
            stats: Arc::new(InferenceStats::new()),
        }
    }

    pub fn predictor(&self) -> &AffectPredictor {
        &self.predictor
    }

    pub fn stats(&self) -> &SharedInferenceStats {
        &self.stats
    }

    /// Summary of counters for display at shutdown
    pub fn summary(&self) -> String {
        self.stats.summary(self.predictor.source())
    }
}

/// Request body could not be turned into a typed request.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid request body: {0}")]
    Body(String),
}

impl From<JsonRejection> for InputError {
    fn from(rejection: JsonRejection) -> Self {
        InputError::Body(rejection.body_text())
    }
}

/// Body of POST /compare
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRequest {
    pub predicted: AffectPoint,
    pub reported: AffectPoint,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn reject(state: &ServerState, err: InputError) -> ApiError {
    tracing::warn!("Rejected request: {}", err);
    state.stats.record_rejected_request();
    error_response(StatusCode::BAD_REQUEST, err)
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// POST /predict
///
/// Synthesizes features from the sample and scores them with both models.
async fn predict(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<PhysiologicalSample>, JsonRejection>,
) -> Result<Json<AffectResult>, ApiError> {
    let Json(sample) = payload.map_err(|e| reject(&state, e.into()))?;

    tracing::info!(heart_rate = sample.heart_rate, eda = sample.eda, "Prediction requested");

    let result = {
        let mut noise = RngNoise::thread();
        state.predictor.infer(&sample, &mut noise)
    };

    match result {
        Ok(result) => {
            state.stats.record_prediction();
            Ok(Json(result))
        }
        Err(e) => {
            tracing::error!("Prediction error: {}", e);
            state.stats.record_prediction_failure();
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

/// POST /compare
async fn compare(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<ComparisonResult>, ApiError> {
    let Json(request) = payload.map_err(|e| reject(&state, e.into()))?;

    let result = compare_points(request.predicted, request.reported);
    state.stats.record_comparison();

    tracing::debug!(
        arousal_gap = result.arousal_gap,
        valence_gap = result.valence_gap,
        significant = result.has_significant_gap,
        "Comparison complete"
    );

    Ok(Json(result))
}

/// GET /stats
async fn stats(State(state): State<Arc<ServerState>>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot(state.predictor.source()))
}

/// Build the router with open CORS on every route
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/compare", post(compare))
        .route("/stats", get(stats))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn bind(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    Ok(listener)
}

/// Run the HTTP server until `shutdown` resolves.
///
/// Returns the server state so callers can report final counters.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<Arc<ServerState>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(ServerState::new(&config));
    let listener = bind(&config).await?;

    tracing::info!(
        instance_id = %state.stats.instance_id(),
        model_source = %state.predictor.source(),
        "Affect inference server listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(state)
}

/// Start the HTTP server in the background
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));

    let listener = bind(&config).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Affect inference server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let app = router(state);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
