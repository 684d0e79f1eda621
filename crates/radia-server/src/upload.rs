//! Upload and normalization pipeline.
//!
//! Validates the filename extension before touching disk, writes the bytes
//! under a microsecond-timestamped name so concurrent uploads never collide,
//! and normalizes WEBP to PNG so downstream consumers (model, report, static
//! serving) only ever see the browser-safe formats.
//!
//! Everything here is synchronous; the predict handler runs it on the
//! blocking pool.

use std::{
  fs,
  path::{Path, PathBuf},
};

use chrono::Utc;

use crate::error::Error;

/// Extensions accepted by the pipeline, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// A persisted upload: its on-disk location and public file name.
#[derive(Debug, Clone)]
pub struct SavedUpload {
  pub file_name: String,
  pub disk_path: PathBuf,
}

impl SavedUpload {
  /// Relative URL clients use to fetch the stored image.
  pub fn public_path(&self) -> String {
    format!("/static/uploads/{}", self.file_name)
  }
}

/// The lowercased extension of `name`, if it has one.
pub fn extension(name: &str) -> Option<String> {
  name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .filter(|ext| !ext.is_empty())
}

pub fn is_allowed(name: &str) -> bool {
  extension(name)
    .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Reduce a client-supplied filename to a safe basename: path components
/// stripped, anything outside `[A-Za-z0-9._-]` replaced with `_`, leading
/// dots removed.
pub fn sanitize_filename(name: &str) -> String {
  let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
  let cleaned: String = base
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
        c
      } else {
        '_'
      }
    })
    .collect();
  let trimmed = cleaned.trim_start_matches('.');
  if trimmed.is_empty() {
    "upload".to_string()
  } else {
    trimmed.to_string()
  }
}

/// Validate, persist, and normalize an upload.
///
/// On success the returned name refers to the final on-disk file — for WEBP
/// input that is the converted PNG, with the original removed.
pub fn save_upload(
  upload_dir: &Path,
  original_name: &str,
  bytes: &[u8],
) -> Result<SavedUpload, Error> {
  let name = sanitize_filename(original_name);
  if !is_allowed(&name) {
    return Err(Error::Validation("File type not allowed".to_string()));
  }

  fs::create_dir_all(upload_dir)
    .map_err(|e| Error::Internal(format!("cannot create upload dir: {e}")))?;

  let stamp = Utc::now().format("%Y%m%d%H%M%S%6f");
  let mut file_name = format!("{stamp}_{name}");
  let mut disk_path = upload_dir.join(&file_name);

  fs::write(&disk_path, bytes)
    .map_err(|e| Error::Internal(format!("cannot write upload: {e}")))?;

  if extension(&file_name).as_deref() == Some("webp") {
    let png_path = convert_webp_to_png(&disk_path).map_err(Error::Conversion)?;
    // Best-effort removal of the original.
    let _ = fs::remove_file(&disk_path);
    file_name = png_path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or(file_name);
    tracing::info!(path = %png_path.display(), "converted WEBP to PNG");
    disk_path = png_path;
  }

  Ok(SavedUpload { file_name, disk_path })
}

fn convert_webp_to_png(path: &Path) -> Result<PathBuf, image::ImageError> {
  let img = image::open(path)?.to_rgb8();
  let png_path = path.with_extension("png");
  img.save(&png_path)?;
  Ok(png_path)
}
