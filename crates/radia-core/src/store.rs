//! The `PredictionStore` trait and its aggregate read model.
//!
//! The trait is implemented by storage backends (e.g. `radia-store-sqlite`).
//! Higher layers (`radia-server`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use serde::Serialize;

use crate::prediction::{NewPrediction, Prediction};

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Dashboard aggregates computed by [`PredictionStore::stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
  /// Total number of stored predictions.
  pub total_scans:    i64,
  /// Predictions labelled `Fractured`.
  pub fractures:      i64,
  /// Mean inference time in seconds; `None` when the table is empty.
  pub avg_latency:    Option<f64>,
  /// Percentage of labelled rows where the prediction matched `true_label`,
  /// rounded to 2 decimals; `None` when no rows are labelled.
  pub model_accuracy: Option<f64>,
  /// Rows with a `true_label` set.
  pub labelled_count: i64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a prediction store backend.
///
/// Writes are upserts keyed on `scan_id`: a colliding write replaces the
/// existing row in place rather than raising a conflict.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PredictionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert a prediction, or replace every field of the existing row (and
  /// re-stamp its timestamp) if `scan_id` is already present. Returns the
  /// stored row.
  fn upsert(
    &self,
    input: NewPrediction,
  ) -> impl Future<Output = Result<Prediction, Self::Error>> + Send + '_;

  /// Compute the dashboard aggregates over all stored rows.
  fn stats(
    &self,
  ) -> impl Future<Output = Result<StatsSummary, Self::Error>> + Send + '_;

  /// The most recently inserted rows, newest first (rowid descending),
  /// capped at `limit`. A non-positive `limit` is treated as 1.
  fn recent(
    &self,
    limit: i64,
  ) -> impl Future<Output = Result<Vec<Prediction>, Self::Error>> + Send + '_;
}
