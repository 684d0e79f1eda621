//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; labels as their display names
//! (`Normal` / `Fractured`).

use chrono::{DateTime, Utc};
use radia_core::prediction::{Label, Prediction};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_label(l: Label) -> &'static str { l.as_str() }

pub fn decode_label(s: &str) -> Result<Label> { Ok(Label::parse(s)?) }

/// A `predictions` row as it comes off the wire, before any parsing.
pub struct RawPrediction {
  pub id:             i64,
  pub scan_id:        String,
  pub patient_name:   String,
  pub label:          String,
  pub confidence:     f64,
  pub inference_time: f64,
  pub image_path:     String,
  pub timestamp:      String,
  pub true_label:     Option<String>,
}

impl RawPrediction {
  pub fn into_prediction(self) -> Result<Prediction> {
    Ok(Prediction {
      id:             self.id,
      scan_id:        self.scan_id,
      patient_name:   self.patient_name,
      label:          decode_label(&self.label)?,
      confidence:     self.confidence,
      inference_time: self.inference_time,
      image_path:     self.image_path,
      timestamp:      decode_dt(&self.timestamp)?,
      true_label:     self.true_label.as_deref().map(decode_label).transpose()?,
    })
  }
}
