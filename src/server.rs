//! JSON HTTP surface.
//!
//! A thin caller around the pipeline for dashboard and integration
//! use. The pipeline itself is single-query-at-a-time; handlers share
//! it behind a mutex, so requests serialize rather than overlap.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Run one query through the pipeline |
//! | `POST` | `/feedback` | Record helpful / not-helpful feedback |
//! | `GET`  | `/stats` | Session, cache, and feedback counters |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses use the envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based
//! dashboards can call the API directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Shared application state: the pipeline behind a mutex.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Mutex<Pipeline>>,
}

/// Start the HTTP surface on the configured bind address. Runs until
/// the process is terminated.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pipeline = Pipeline::new(config);
    let state = AppState {
        pipeline: Arc::new(Mutex::new(pipeline)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/query", post(handle_query))
        .route("/feedback", post(handle_feedback))
        .route("/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("CivicMind listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Request / Response Types ============

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    query: String,
    helpful: bool,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    query_count: u64,
    average_response_time: Option<f64>,
    cache: crate::cache::CacheStats,
    total_feedback: u64,
    satisfaction_rate: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

fn error_response(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code,
            message: message.into(),
        },
    };
    (status, Json(body)).into_response()
}

// ============ Handlers ============

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    if request.query.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "query must not be empty",
        );
    }

    let mut pipeline = state.pipeline.lock().await;
    let result = pipeline.process(&request.query).await;
    Json(result).into_response()
}

async fn handle_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Response {
    if request.query.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "query must not be empty",
        );
    }

    let mut pipeline = state.pipeline.lock().await;
    pipeline.record_feedback(&request.query, request.helpful);
    Json(serde_json::json!({ "recorded": true })).into_response()
}

async fn handle_stats(State(state): State<AppState>) -> Response {
    let pipeline = state.pipeline.lock().await;
    let response = StatsResponse {
        query_count: pipeline.session.query_count,
        average_response_time: pipeline.session.average_response_time(),
        cache: pipeline.cache_stats(),
        total_feedback: pipeline.feedback().total_feedback(),
        satisfaction_rate: pipeline.feedback().positive_rate(),
    };
    Json(response).into_response()
}
