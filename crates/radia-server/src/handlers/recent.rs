//! GET `/api/recent?n=<int>` — most recent predictions, newest first.

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use radia_core::store::PredictionStore;
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

#[derive(Deserialize)]
pub struct RecentQuery {
  n: Option<i64>,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(query): Query<RecentQuery>,
) -> Response
where
  S: PredictionStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let limit = query.n.unwrap_or(10).max(1);

  match state.store.recent(limit).await {
    Ok(rows) => Json(json!({ "recent": rows })).into_response(),
    Err(e) => {
      tracing::error!(error = %e, "failed to fetch recent rows");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to fetch recent rows" })),
      )
        .into_response()
    }
  }
}
