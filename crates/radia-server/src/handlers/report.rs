//! GET/POST `/download_report` — render the one-page PDF attachment.
//!
//! All fields come from request parameters (query string for GET, urlencoded
//! form for POST); nothing is read from storage. A missing or unresolvable
//! image degrades to a text-only page inside `radia-report`.

use axum::{
  Form,
  extract::{Query, State},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use radia_core::store::PredictionStore;
use radia_report::ReportParams;
use serde::Deserialize;

use crate::{AppState, error::Error};

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
  #[serde(default = "default_prediction")]
  prediction:   String,
  #[serde(default = "default_accuracy")]
  accuracy:     String,
  #[serde(default)]
  image_path:   Option<String>,
  #[serde(default = "default_patient_name")]
  patient_name: String,
  #[serde(default)]
  current_date: Option<String>,
}

fn default_prediction() -> String { "Unknown".to_string() }
fn default_accuracy() -> String { "N/A".to_string() }
fn default_patient_name() -> String { "Uploaded Patient".to_string() }

pub async fn get_handler<S>(
  State(state): State<AppState<S>>,
  Query(request): Query<ReportRequest>,
) -> Response
where
  S: PredictionStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  render(&state, request).await
}

pub async fn post_handler<S>(
  State(state): State<AppState<S>>,
  Form(request): Form<ReportRequest>,
) -> Response
where
  S: PredictionStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  render(&state, request).await
}

async fn render<S>(state: &AppState<S>, request: ReportRequest) -> Response
where
  S: PredictionStore + Clone + Send + Sync + 'static,
{
  let date = request
    .current_date
    .unwrap_or_else(|| Utc::now().format("%B %d, %Y").to_string());

  let params = ReportParams {
    diagnosis:      request.prediction,
    confidence_pct: request.accuracy,
    image_path:     request.image_path,
    patient_name:   request.patient_name,
    date,
  };

  let upload_dir = state.config.upload_dir.clone();
  let rendered = tokio::task::spawn_blocking(move || {
    radia_report::render(&params, &upload_dir)
  })
  .await
  .map_err(|e| Error::Internal(e.to_string()))
  .and_then(|r| r.map_err(Error::Report));

  match rendered {
    Ok(bytes) => (
      [
        (header::CONTENT_TYPE, "application/pdf"),
        (
          header::CONTENT_DISPOSITION,
          "attachment; filename=\"xray_report.pdf\"",
        ),
      ],
      bytes,
    )
      .into_response(),
    Err(e) => {
      tracing::error!(error = %e, "report generation failed");
      (StatusCode::INTERNAL_SERVER_ERROR, e.message().to_string())
        .into_response()
    }
  }
}
