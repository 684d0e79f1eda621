//! [`SqliteStore`] — the SQLite implementation of [`PredictionStore`].

use std::path::Path;

use chrono::Utc;
use radia_core::{
  prediction::{NewPrediction, Prediction, round2},
  store::{PredictionStore, StatsSummary},
};

use crate::{
  Error, Result,
  encode::{RawPrediction, encode_dt, encode_label},
  schema::SCHEMA,
};

const PREDICTION_COLUMNS: &str = "id, scan_id, patient_name, label, \
   confidence, inference_time, image_path, timestamp, true_label";

fn raw_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPrediction> {
  Ok(RawPrediction {
    id:             row.get(0)?,
    scan_id:        row.get(1)?,
    patient_name:   row.get(2)?,
    label:          row.get(3)?,
    confidence:     row.get(4)?,
    inference_time: row.get(5)?,
    image_path:     row.get(6)?,
    timestamp:      row.get(7)?,
    true_label:     row.get(8)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Radia prediction store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Set the ground-truth label on an existing row. Used when a reviewed
  /// diagnosis comes back, which feeds the accuracy aggregate.
  pub async fn set_true_label(
    &self,
    scan_id: &str,
    true_label: radia_core::prediction::Label,
  ) -> Result<bool> {
    let scan_id = scan_id.to_owned();
    let label_str = encode_label(true_label).to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE predictions SET true_label = ?1 WHERE scan_id = ?2",
          rusqlite::params![label_str, scan_id],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(updated)
  }
}

// ─── PredictionStore impl ────────────────────────────────────────────────────

impl PredictionStore for SqliteStore {
  type Error = Error;

  async fn upsert(&self, input: NewPrediction) -> Result<Prediction> {
    let timestamp_str = encode_dt(Utc::now());
    let label_str     = encode_label(input.label).to_owned();
    let scan_id       = input.scan_id.clone();

    let raw: RawPrediction = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO predictions (
             scan_id, patient_name, label, confidence,
             inference_time, image_path, timestamp
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(scan_id) DO UPDATE SET
             patient_name   = excluded.patient_name,
             label          = excluded.label,
             confidence     = excluded.confidence,
             inference_time = excluded.inference_time,
             image_path     = excluded.image_path,
             timestamp      = excluded.timestamp",
          rusqlite::params![
            input.scan_id,
            input.patient_name,
            label_str,
            input.confidence,
            input.inference_time,
            input.image_path,
            timestamp_str,
          ],
        )?;
        let raw = tx.query_row(
          &format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE scan_id = ?1"
          ),
          rusqlite::params![input.scan_id],
          raw_from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await
      .map_err(|e| match e {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::QueryReturnedNoRows) => {
          Error::RowVanished(scan_id.clone())
        }
        other => Error::Database(other),
      })?;

    raw.into_prediction()
  }

  async fn stats(&self) -> Result<StatsSummary> {
    let (total, fractures, avg_latency, labelled, accuracy_frac): (
      i64,
      i64,
      Option<f64>,
      i64,
      Option<f64>,
    ) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT
             COUNT(*),
             COALESCE(SUM(label = 'Fractured'), 0),
             AVG(inference_time),
             COUNT(true_label),
             AVG(CASE WHEN true_label IS NOT NULL
                      THEN (label = true_label) END)
           FROM predictions",
          [],
          |row| {
            Ok((
              row.get(0)?,
              row.get(1)?,
              row.get(2)?,
              row.get(3)?,
              row.get(4)?,
            ))
          },
        )?)
      })
      .await?;

    Ok(StatsSummary {
      total_scans:    total,
      fractures,
      avg_latency,
      model_accuracy: accuracy_frac.map(|f| round2(f * 100.0)),
      labelled_count: labelled,
    })
  }

  async fn recent(&self, limit: i64) -> Result<Vec<Prediction>> {
    let limit = limit.max(1);

    let raws: Vec<RawPrediction> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PREDICTION_COLUMNS} FROM predictions
           ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], raw_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPrediction::into_prediction).collect()
  }
}
