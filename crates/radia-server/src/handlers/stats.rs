//! GET `/api/stats` — dashboard aggregates.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use radia_core::store::PredictionStore;
use serde_json::json;

use crate::AppState;

pub async fn handler<S>(State(state): State<AppState<S>>) -> Response
where
  S: PredictionStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  match state.store.stats().await {
    Ok(stats) => Json(stats).into_response(),
    Err(e) => {
      tracing::error!(error = %e, "failed to fetch stats");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to fetch stats" })),
      )
        .into_response()
    }
  }
}
