//! Error type for `radia-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] radia_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An upserted row could not be read back, which should be impossible
  /// inside the write transaction.
  #[error("row vanished after upsert: scan_id {0:?}")]
  RowVanished(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
