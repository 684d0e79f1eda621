//! POST `/predict` — upload, normalize, classify, persist, respond.
//!
//! The pipeline runs Validating → Saving → Normalizing → Inferring →
//! Persisting → Responding. Validation and normalization failures respond
//! 400 before inference; inference failures respond 500 before persistence;
//! a persistence failure is logged and the computed result is returned
//! anyway. The response shape (JSON vs HTML) is negotiated once at entry
//! and applied to every exit path.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Multipart, State},
  http::HeaderMap,
  response::{Html, IntoResponse, Response},
};
use bytes::Bytes;
use chrono::Utc;
use radia_core::{
  prediction::{
    Label, NewPrediction, confidence_for, confidence_pct, round4, scan_id_for,
  },
  store::PredictionStore,
};
use serde_json::json;

use crate::{
  AppState,
  error::{Error, error_response},
  pages, upload, wants_json,
};

const DOCTOR_NOTE: &str = "Please consult your physician if symptoms persist.";

/// The computed result of one predict call, shared by both response shapes.
struct Outcome {
  scan_id:        String,
  label:          Label,
  confidence:     f64,
  confidence_pct: f64,
  image_path:     String,
  patient_name:   String,
  inference_time: f64,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  multipart: Multipart,
) -> Response
where
  S: PredictionStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let as_json = wants_json(&headers);

  match run(&state, multipart).await {
    Ok(outcome) => respond(as_json, &outcome),
    Err(e) => {
      tracing::error!(error = %e, "predict failed");
      error_response(as_json, &e)
    }
  }
}

async fn run<S>(
  state: &AppState<S>,
  mut multipart: Multipart,
) -> Result<Outcome, Error>
where
  S: PredictionStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  // ── Validating ────────────────────────────────────────────────────────────

  let mut file: Option<(String, Bytes)> = None;
  let mut patient_name = String::new();

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| Error::Validation(format!("Malformed upload: {e}")))?
  {
    let name = field.name().map(str::to_string);
    match name.as_deref() {
      Some("file") => {
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
          .bytes()
          .await
          .map_err(|e| Error::Validation(format!("Malformed upload: {e}")))?;
        file = Some((filename, bytes));
      }
      Some("patient_name") => {
        patient_name = field
          .text()
          .await
          .map_err(|e| Error::Validation(format!("Malformed upload: {e}")))?;
      }
      _ => {}
    }
  }

  let (filename, bytes) =
    file.ok_or_else(|| Error::Validation("No file uploaded".to_string()))?;
  if filename.is_empty() {
    return Err(Error::Validation("No file selected".to_string()));
  }

  let patient_name = patient_name.trim().to_string();
  if patient_name.is_empty() {
    tracing::info!("rejecting upload: missing patient name");
    return Err(Error::Validation("Patient name is required.".to_string()));
  }

  // ── Saving + Normalizing (blocking pool; rejects bad extensions) ──────────

  let upload_dir = state.config.upload_dir.clone();
  let saved = tokio::task::spawn_blocking(move || {
    upload::save_upload(&upload_dir, &filename, &bytes)
  })
  .await
  .map_err(|e| Error::Internal(e.to_string()))??;

  // ── Inferring ─────────────────────────────────────────────────────────────

  let classifier = Arc::clone(&state.classifier);
  let scan_path = saved.disk_path.clone();
  let inference =
    tokio::task::spawn_blocking(move || classifier.classify(&scan_path))
      .await
      .map_err(|e| Error::Internal(e.to_string()))?
      .map_err(Error::Inference)?;

  let label = Label::from_probability(inference.probability);
  let confidence = confidence_for(inference.probability, label);
  let outcome = Outcome {
    scan_id:        scan_id_for(Utc::now()),
    label,
    confidence,
    confidence_pct: confidence_pct(confidence),
    image_path:     saved.public_path(),
    patient_name,
    inference_time: round4(inference.elapsed_seconds),
  };

  // ── Persisting (best-effort: the result still reaches the client) ─────────

  let write = NewPrediction {
    scan_id:        outcome.scan_id.clone(),
    patient_name:   outcome.patient_name.clone(),
    label:          outcome.label,
    confidence:     outcome.confidence,
    inference_time: outcome.inference_time,
    image_path:     outcome.image_path.clone(),
  };
  if let Err(e) = state.store.upsert(write).await {
    tracing::error!(error = %e, scan_id = %outcome.scan_id,
      "failed to persist prediction");
  }

  Ok(outcome)
}

fn respond(as_json: bool, outcome: &Outcome) -> Response {
  if as_json {
    return Json(json!({
      "id":             outcome.scan_id,
      "label":          outcome.label,
      "confidence":     outcome.confidence,
      "confidence_pct": outcome.confidence_pct,
      "image_path":     outcome.image_path,
      "patient_name":   outcome.patient_name,
      "inference_time": outcome.inference_time,
    }))
    .into_response();
  }

  let current_date = Utc::now().format("%B %d, %Y").to_string();
  Html(pages::result(
    outcome.label.as_str(),
    outcome.confidence_pct,
    &outcome.image_path,
    DOCTOR_NOTE,
    &current_date,
    &outcome.patient_name,
  ))
  .into_response()
}
