//! Inference adapter: a pretrained fracture classifier behind a narrow
//! interface, with a demo-mode fallback when no model artifact is present.
//!
//! The model is loaded once at process start and then shared immutably by
//! all request handlers; [`Classifier::classify`] takes `&self` and performs
//! no interior mutation on the ONNX path. Interpreting the returned
//! probability (label threshold, reported confidence) is the caller's
//! policy, not this crate's.

use std::{path::Path, time::Instant};

use rand::Rng as _;
use thiserror::Error;
use tract_onnx::prelude::*;

type OnnxPlan = TypedRunnableModel<TypedModel>;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot decode image: {0}")]
  Image(#[from] image::ImageError),

  #[error("model runtime error: {0}")]
  Model(String),

  #[error("model produced an empty output tensor")]
  EmptyOutput,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classifier ──────────────────────────────────────────────────────────────

/// Outcome of a single forward pass (or its demo-mode stand-in).
#[derive(Debug, Clone, Copy)]
pub struct Inference {
  /// Raw score of the first class unit, in [0, 1].
  pub probability:     f64,
  /// Wall-clock time spent in [`Classifier::classify`].
  pub elapsed_seconds: f64,
}

enum Backend {
  Onnx(Box<OnnxPlan>),
  Demo,
}

/// An X-ray image classifier.
///
/// Built once at startup; the backend choice is fixed for the process
/// lifetime. When the configured model artifact is missing or unloadable the
/// classifier degrades to demo mode, emitting synthetic probabilities in
/// [0.75, 0.95] — an explicit operating mode, not an error.
pub struct Classifier {
  backend:    Backend,
  input_size: u32,
}

impl Classifier {
  /// Build a classifier, preferring the ONNX artifact at `model_path`.
  pub fn load(model_path: Option<&Path>, input_size: u32) -> Self {
    let backend = match model_path {
      Some(path) if path.exists() => {
        match load_onnx(path, input_size as usize) {
          Ok(plan) => {
            tracing::info!(path = %path.display(), "model loaded");
            Backend::Onnx(Box::new(plan))
          }
          Err(e) => {
            tracing::warn!(path = %path.display(), error = %e,
              "failed to load model; running in demo mode");
            Backend::Demo
          }
        }
      }
      Some(path) => {
        tracing::warn!(path = %path.display(),
          "model artifact not found; running in demo mode");
        Backend::Demo
      }
      None => {
        tracing::info!("no model configured; running in demo mode");
        Backend::Demo
      }
    };

    Self { backend, input_size }
  }

  /// A classifier that always runs in demo mode.
  pub fn demo(input_size: u32) -> Self {
    Self { backend: Backend::Demo, input_size }
  }

  pub fn is_demo(&self) -> bool { matches!(self.backend, Backend::Demo) }

  /// Classify the image at `path`, returning the raw class-0 probability
  /// and the wall-clock time taken.
  pub fn classify(&self, path: &Path) -> Result<Inference> {
    let start = Instant::now();

    let probability = match &self.backend {
      Backend::Onnx(plan) => self.forward(plan, path)?,
      Backend::Demo => rand::rng().random_range(0.75..0.95),
    };

    Ok(Inference {
      probability,
      elapsed_seconds: start.elapsed().as_secs_f64(),
    })
  }

  fn forward(&self, plan: &OnnxPlan, path: &Path) -> Result<f64> {
    let size = self.input_size;
    let img = image::open(path)?
      .resize_exact(size, size, image::imageops::FilterType::Triangle)
      .to_rgb8();

    // NHWC, pixel values scaled to [0, 1].
    let s = size as usize;
    let input =
      tract_ndarray::Array4::from_shape_fn((1, s, s, 3), |(_, y, x, c)| {
        f32::from(img.get_pixel(x as u32, y as u32)[c]) / 255.0
      });

    let outputs = plan
      .run(tvec!(input.into_tensor().into()))
      .map_err(|e| Error::Model(e.to_string()))?;
    let view = outputs[0]
      .to_array_view::<f32>()
      .map_err(|e| Error::Model(e.to_string()))?;
    let first = view.iter().next().copied().ok_or(Error::EmptyOutput)?;

    Ok(f64::from(first))
  }
}

fn load_onnx(path: &Path, size: usize) -> TractResult<OnnxPlan> {
  tract_onnx::onnx()
    .model_for_path(path)?
    .with_input_fact(
      0,
      InferenceFact::dt_shape(f32::datum_type(), tvec!(1, size, size, 3)),
    )?
    .into_optimized()?
    .into_runnable()
}
