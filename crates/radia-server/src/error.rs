//! Error taxonomy for the `/predict` pipeline and its axum responses.
//!
//! Persistence failures never appear here: the predict handler logs them and
//! responds with the computed result anyway. The `/api/*` handlers build
//! their JSON error bodies inline since they are JSON-only.

use axum::{
  Json,
  http::StatusCode,
  response::{Html, IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::pages;

#[derive(Debug, Error)]
pub enum Error {
  /// Client input problem, reported verbatim.
  #[error("{0}")]
  Validation(String),

  /// WEBP-to-PNG normalization failed; aborts before inference.
  #[error("WEBP conversion failed: {0}")]
  Conversion(#[source] image::ImageError),

  /// The model runtime failed on a saved upload.
  #[error("prediction error: {0}")]
  Inference(#[source] radia_model::Error),

  /// PDF generation failed.
  #[error("report error: {0}")]
  Report(#[source] radia_report::Error),

  /// Catch-all for failures the client gets no detail about beyond a
  /// generic message (task join errors, filesystem errors).
  #[error("internal error: {0}")]
  Internal(String),
}

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::Validation(_) | Error::Conversion(_) => StatusCode::BAD_REQUEST,
      Error::Inference(_) | Error::Report(_) | Error::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  /// Short human-readable message for the client.
  pub fn message(&self) -> &str {
    match self {
      Error::Validation(msg) => msg,
      Error::Conversion(_) => "WEBP conversion failed",
      Error::Inference(_) => "Prediction error",
      Error::Report(_) => "Report generation failed",
      Error::Internal(_) => "Unhandled server error",
    }
  }

  /// Supplementary detail, included as a `details` field in JSON mode.
  pub fn details(&self) -> Option<String> {
    match self {
      Error::Validation(_) => None,
      Error::Conversion(e) => Some(e.to_string()),
      Error::Inference(e) => Some(e.to_string()),
      Error::Report(e) => Some(e.to_string()),
      Error::Internal(e) => Some(e.clone()),
    }
  }
}

/// Build the error response in whichever shape was negotiated at entry.
pub fn error_response(wants_json: bool, err: &Error) -> Response {
  let status = err.status();

  if wants_json {
    let mut body = json!({ "error": err.message() });
    if let Some(details) = err.details() {
      body["details"] = json!(details);
    }
    return (status, Json(body)).into_response();
  }

  let banner = match err.details() {
    Some(details) => format!("{}: {details}", err.message()),
    None => err.message().to_string(),
  };
  (status, Html(pages::dashboard(Some(&banner)))).into_response()
}
