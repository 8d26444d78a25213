use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use daat_core::preprocess::Query;
use daat_core::{RetrievalEngine, RetrievalResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct QueryRequest {
    pub queries: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(rename = "Response")]
    pub response: RetrievalResponse,
    /// Seconds spent handling the request, as a decimal string.
    pub time_taken: String,
}

/// The index is frozen before serving, so handlers share it without locking.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RetrievalEngine>,
}

pub fn build_app(engine: Arc<RetrievalEngine>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/execute_query", post(execute_query))
        .with_state(AppState { engine })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn execute_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, StatusCode> {
    let start = Instant::now();
    let queries: Vec<Query> = req.queries.iter().filter_map(|q| Query::parse(q)).collect();
    let engine = Arc::clone(&state.engine);
    // merges are CPU-bound; keep them off the async workers
    let joined = tokio::task::spawn_blocking(move || engine.run_queries(&queries)).await;
    batch_reply(joined, start)
}

/// A batch that never finished is a server error, not an empty result.
fn batch_reply(
    joined: Result<RetrievalResponse, JoinError>,
    start: Instant,
) -> Result<Json<QueryResponse>, StatusCode> {
    match joined {
        Ok(response) => Ok(Json(QueryResponse { response, time_taken: start.elapsed().as_secs_f64().to_string() })),
        Err(e) => {
            tracing::error!(error = %e, "query batch failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_batch_is_a_server_error() {
        let joined = tokio::task::spawn_blocking(|| -> RetrievalResponse { panic!("merge blew up") }).await;
        assert!(matches!(batch_reply(joined, Instant::now()), Err(StatusCode::INTERNAL_SERVER_ERROR)));
    }

    #[tokio::test]
    async fn finished_batch_is_returned() {
        let joined = tokio::task::spawn_blocking(RetrievalResponse::default).await;
        let Ok(Json(reply)) = batch_reply(joined, Instant::now()) else {
            panic!("expected a reply");
        };
        assert_eq!(reply.response, RetrievalResponse::default());
        assert!(reply.time_taken.parse::<f64>().is_ok());
    }
}
