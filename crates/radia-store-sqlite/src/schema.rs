//! SQL schema for the Radia SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS predictions (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id        TEXT NOT NULL UNIQUE,
    patient_name   TEXT NOT NULL,
    label          TEXT NOT NULL,   -- 'Normal' | 'Fractured'
    confidence     REAL NOT NULL,   -- confidence in the predicted label, [0,1]
    inference_time REAL NOT NULL,   -- wall-clock seconds
    image_path     TEXT NOT NULL,   -- relative URL under /static/uploads/
    timestamp      TEXT NOT NULL,   -- ISO 8601 UTC; stamped on every write
    true_label     TEXT             -- ground truth, set out-of-band
);

CREATE INDEX IF NOT EXISTS predictions_scan_id_idx ON predictions(scan_id);

PRAGMA user_version = 1;
";
