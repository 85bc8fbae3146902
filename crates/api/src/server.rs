use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handler::StoryPipeline;

/// Same route as the API Gateway deployment, for running outside Lambda.
pub fn router(pipeline: Arc<StoryPipeline>) -> Router {
    Router::new()
        .route("/story", post(create_story))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

pub async fn serve(pipeline: Arc<StoryPipeline>, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, router(pipeline))
        .await
        .context("Local server stopped")
}

async fn create_story(State(pipeline): State<Arc<StoryPipeline>>, body: Bytes) -> Response {
    let outcome = pipeline.handle(&body).await;
    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        outcome.to_json(),
    )
        .into_response()
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
