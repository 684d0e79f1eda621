//! Prediction — the single persisted entity, and the label-mapping policy.
//!
//! The model emits a raw probability; everything user-facing (label,
//! reported confidence, scan id) is derived here so the storage and HTTP
//! layers never reinterpret model output.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Label ───────────────────────────────────────────────────────────────────

/// Classification outcome for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
  Normal,
  Fractured,
}

impl Label {
  /// Threshold policy: the model's class-0 unit is the "Normal" score.
  pub fn from_probability(probability: f64) -> Self {
    if probability > 0.5 { Label::Normal } else { Label::Fractured }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Label::Normal => "Normal",
      Label::Fractured => "Fractured",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "Normal" => Ok(Label::Normal),
      "Fractured" => Ok(Label::Fractured),
      other => Err(Error::UnknownLabel(other.to_string())),
    }
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Derived confidence ──────────────────────────────────────────────────────

/// Confidence in the *predicted* label, as opposed to the raw class-0 score.
pub fn confidence_for(probability: f64, label: Label) -> f64 {
  match label {
    Label::Normal => probability,
    Label::Fractured => 1.0 - probability,
  }
}

/// Confidence as a percentage, rounded to 2 decimals for display.
pub fn confidence_pct(confidence: f64) -> f64 {
  round2(confidence * 100.0)
}

pub fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

pub fn round4(x: f64) -> f64 { (x * 10_000.0).round() / 10_000.0 }

// ─── Scan id ─────────────────────────────────────────────────────────────────

/// Derive a scan id from a request timestamp: `A` + YYMMDDHHMMSS.
///
/// Second resolution means two requests in the same second share an id; the
/// store treats a colliding write as an idempotent overwrite.
pub fn scan_id_for(at: DateTime<Utc>) -> String {
  format!("A{}", at.format("%y%m%d%H%M%S"))
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// A persisted prediction row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
  pub id:             i64,
  pub scan_id:        String,
  pub patient_name:   String,
  pub label:          Label,
  pub confidence:     f64,
  pub inference_time: f64,
  pub image_path:     String,
  pub timestamp:      DateTime<Utc>,
  pub true_label:     Option<Label>,
}

/// Input for a prediction write. The store assigns `id` and `timestamp`.
#[derive(Debug, Clone)]
pub struct NewPrediction {
  pub scan_id:        String,
  pub patient_name:   String,
  pub label:          Label,
  pub confidence:     f64,
  pub inference_time: f64,
  pub image_path:     String,
}
