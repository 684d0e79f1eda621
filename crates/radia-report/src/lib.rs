//! One-page PDF scan report.
//!
//! Fixed A4 layout: title, four label/value lines, the scan image scaled
//! into a fixed bounding box, and a closing note. The image is best-effort:
//! an unresolvable or undecodable path degrades to a text-only page with a
//! warning, never a failure.
//!
//! The image is embedded as a raw RGB8 `ImageXObject` built from an
//! `image`-crate decode, so any format the upload pipeline accepts can be
//! embedded directly.

use std::path::{Path, PathBuf};

use printpdf::{
  BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject,
  Mm, PdfDocument, Px,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("pdf generation error: {0}")]
  Pdf(#[from] printpdf::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything the report shows. All fields arrive as request parameters;
/// nothing is read from storage.
#[derive(Debug, Clone)]
pub struct ReportParams {
  pub diagnosis:      String,
  /// Confidence percentage as display text — may be `"N/A"`.
  pub confidence_pct: String,
  pub image_path:     Option<String>,
  pub patient_name:   String,
  pub date:           String,
}

// The layout is specified in points on a 595x842 pt page; printpdf wants mm.
fn pt(v: f32) -> Mm { Mm(v * 25.4 / 72.0) }

/// Render the report to PDF bytes.
pub fn render(params: &ReportParams, upload_dir: &Path) -> Result<Vec<u8>> {
  let (doc, page, layer) =
    PdfDocument::new("X-ray Analysis Report", Mm(210.0), Mm(297.0), "report");
  let layer = doc.get_page(page).get_layer(layer);

  let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
  let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
  let oblique = doc.add_builtin_font(BuiltinFont::HelveticaOblique)?;

  layer.use_text("X-ray Analysis Report", 20.0, pt(40.0), pt(800.0), &bold);

  layer.use_text(format!("Date: {}", params.date), 12.0, pt(40.0), pt(780.0), &regular);
  layer.use_text(format!("Patient: {}", params.patient_name), 12.0, pt(40.0), pt(760.0), &regular);
  layer.use_text(format!("Diagnosis: {}", params.diagnosis), 12.0, pt(40.0), pt(740.0), &regular);
  layer.use_text(format!("Confidence: {}%", params.confidence_pct), 12.0, pt(40.0), pt(720.0), &regular);

  if let Some(ref image_path) = params.image_path {
    match resolve_image(image_path, upload_dir) {
      Some(path) => embed_image(&layer, &path),
      None => tracing::warn!(
        image_path,
        "report image not found on disk; omitting from PDF"
      ),
    }
  }

  layer.use_text("Doctor's Note:", 12.0, pt(40.0), pt(360.0), &regular);
  layer.use_text(
    "Always consult a medical professional if you have any concerns.",
    12.0,
    pt(60.0),
    pt(340.0),
    &oblique,
  );

  Ok(doc.save_to_bytes()?)
}

/// Try the path as given (relative, leading `/` stripped), then its basename
/// under the upload directory.
fn resolve_image(image_path: &str, upload_dir: &Path) -> Option<PathBuf> {
  let candidate = PathBuf::from(image_path.trim_start_matches('/'));
  if candidate.is_file() {
    return Some(candidate);
  }
  let fallback = upload_dir.join(candidate.file_name()?);
  fallback.is_file().then_some(fallback)
}

/// Decode and place the scan image, scaled to fit a 300x300 pt box with its
/// aspect ratio preserved. Decode failure is a warning, not an error.
fn embed_image(layer: &printpdf::PdfLayerReference, path: &Path) {
  let rgb = match image::open(path) {
    Ok(img) => img.to_rgb8(),
    Err(e) => {
      tracing::warn!(path = %path.display(), error = %e,
        "could not embed image into PDF");
      return;
    }
  };

  let (width, height) = rgb.dimensions();

  const DPI: f32 = 300.0;
  let native_w_mm = width as f32 * 25.4 / DPI;
  let native_h_mm = height as f32 * 25.4 / DPI;
  let box_mm = pt(300.0).0;
  let scale = (box_mm / native_w_mm).min(box_mm / native_h_mm);

  let xobject = ImageXObject {
    width:              Px(width as usize),
    height:             Px(height as usize),
    color_space:        ColorSpace::Rgb,
    bits_per_component: ColorBits::Bit8,
    interpolate:        true,
    image_data:         rgb.into_raw(),
    image_filter:       None,
    smask:              None,
    clipping_bbox:      None,
  };

  Image::from(xobject).add_to_layer(layer.clone(), ImageTransform {
    translate_x: Some(pt(40.0)),
    translate_y: Some(pt(380.0)),
    dpi: Some(DPI),
    scale_x: Some(scale),
    scale_y: Some(scale),
    ..Default::default()
  });
}
