//! HTTP layer for the Radia X-ray triage service.
//!
//! Exposes an axum [`Router`] over any [`PredictionStore`]: dashboard page,
//! multipart `/predict`, the JSON stats/recent API, PDF report download, and
//! static serving of stored uploads.

pub mod error;
pub mod handlers;
pub mod pages;
pub mod upload;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  http::{HeaderMap, header},
  response::Html,
  routing::{get, post},
};
use radia_core::store::PredictionStore;
use radia_model::Classifier;
use serde::Deserialize;
use tower_http::services::ServeDir;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `RADIA_*` environment variables. Every field has a default so the server
/// runs with no config file at all (demo mode, local SQLite).
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  #[serde(default = "default_upload_dir")]
  pub upload_dir:       PathBuf,
  /// Path to the ONNX model artifact; absent or unloadable means demo mode.
  #[serde(default)]
  pub model_path:       Option<PathBuf>,
  /// Square input resolution the model expects.
  #[serde(default = "default_model_input_size")]
  pub model_input_size: u32,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_store_path() -> PathBuf { PathBuf::from("radia.db") }
fn default_upload_dir() -> PathBuf { PathBuf::from("static/uploads") }
fn default_model_input_size() -> u32 { 150 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers. The classifier is loaded
/// once at startup and read concurrently by every request.
#[derive(Clone)]
pub struct AppState<S: PredictionStore> {
  pub store:      Arc<S>,
  pub classifier: Arc<Classifier>,
  pub config:     Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the service.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: PredictionStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let uploads = ServeDir::new(&state.config.upload_dir);

  Router::new()
    .route("/",                get(index_handler))
    .route("/predict",         post(handlers::predict::handler::<S>))
    .route("/api/stats",       get(handlers::stats::handler::<S>))
    .route("/api/recent",      get(handlers::recent::handler::<S>))
    .route(
      "/download_report",
      get(handlers::report::get_handler::<S>)
        .post(handlers::report::post_handler::<S>),
    )
    .nest_service("/static/uploads", uploads)
    .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
    .with_state(state)
}

async fn index_handler() -> Html<String> { Html(pages::dashboard(None)) }

// ─── Content negotiation ──────────────────────────────────────────────────────

/// JSON iff the client asked for it: `Accept: application/json` or the
/// `X-Requested-With: XMLHttpRequest` marker. Decided once per request.
pub fn wants_json(headers: &HeaderMap) -> bool {
  let accept = headers
    .get(header::ACCEPT)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("");
  let requested_with = headers
    .get("x-requested-with")
    .and_then(|v| v.to_str().ok())
    .unwrap_or("");
  accept.contains("application/json") || requested_with == "XMLHttpRequest"
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use radia_core::store::PredictionStore as _;
  use radia_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  const BOUNDARY: &str = "radia-test-boundary";

  async fn make_state() -> (AppState<SqliteStore>, tempfile::TempDir) {
    let uploads = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig {
      host: "127.0.0.1".to_string(),
      port: 5000,
      store_path: PathBuf::from(":memory:"),
      upload_dir: uploads.path().to_path_buf(),
      model_path: None,
      model_input_size: 150,
    };

    let state = AppState {
      store:      Arc::new(store),
      classifier: Arc::new(Classifier::demo(config.model_input_size)),
      config:     Arc::new(config),
    };
    (state, uploads)
  }

  fn multipart_body(
    patient_name: Option<&str>,
    file: Option<(&str, &[u8])>,
  ) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(name) = patient_name {
      body.extend_from_slice(
        format!(
          "--{BOUNDARY}\r\nContent-Disposition: form-data; \
           name=\"patient_name\"\r\n\r\n{name}\r\n"
        )
        .as_bytes(),
      );
    }
    if let Some((filename, bytes)) = file {
      body.extend_from_slice(
        format!(
          "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
           filename=\"{filename}\"\r\nContent-Type: \
           application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
      );
      body.extend_from_slice(bytes);
      body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
  }

  async fn predict(
    state: AppState<SqliteStore>,
    extra_headers: Vec<(header::HeaderName, &str)>,
    patient_name: Option<&str>,
    file: Option<(&str, &[u8])>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method("POST").uri("/predict").header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    for (k, v) in extra_headers {
      builder = builder.header(k, v);
    }
    let req = builder
      .body(Body::from(multipart_body(patient_name, file)))
      .unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn json_of(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(64, 64, image::Rgb([120, 120, 120]));
    let mut cursor = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
      .write_to(&mut cursor, image::ImageFormat::Png)
      .unwrap();
    cursor.into_inner()
  }

  fn webp_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(48, 48, image::Rgb([90, 90, 90]));
    let mut cursor = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
      .write_to(&mut cursor, image::ImageFormat::WebP)
      .unwrap();
    cursor.into_inner()
  }

  // ── /predict validation ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn predict_without_file_part_returns_400_and_writes_nothing() {
    let (state, _uploads) = make_state().await;

    let resp = predict(
      state.clone(),
      vec![(header::ACCEPT, "application/json")],
      Some("Jane Doe"),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_of(resp).await;
    assert_eq!(body["error"], "No file uploaded");

    let stats = state.store.stats().await.unwrap();
    assert_eq!(stats.total_scans, 0);
  }

  #[tokio::test]
  async fn predict_with_empty_filename_returns_400() {
    let (state, _uploads) = make_state().await;

    let resp = predict(
      state,
      vec![(header::ACCEPT, "application/json")],
      Some("Jane Doe"),
      Some(("", b"data")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_of(resp).await;
    assert_eq!(body["error"], "No file selected");
  }

  #[tokio::test]
  async fn predict_without_patient_name_returns_400() {
    let (state, _uploads) = make_state().await;

    let resp = predict(
      state,
      vec![(header::ACCEPT, "application/json")],
      Some("   "),
      Some(("scan.png", png_bytes().as_slice())),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_of(resp).await;
    assert_eq!(body["error"], "Patient name is required.");
  }

  #[tokio::test]
  async fn predict_with_disallowed_extension_returns_400() {
    let (state, _uploads) = make_state().await;

    let resp = predict(
      state,
      vec![(header::ACCEPT, "application/json")],
      Some("Jane Doe"),
      Some(("notes.txt", b"not an image")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_of(resp).await;
    assert_eq!(body["error"], "File type not allowed");
  }

  #[tokio::test]
  async fn xml_http_request_marker_selects_json_errors() {
    let (state, _uploads) = make_state().await;

    let resp = predict(
      state,
      vec![(
        header::HeaderName::from_static("x-requested-with"),
        "XMLHttpRequest",
      )],
      Some("Jane Doe"),
      None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_of(resp).await;
    assert_eq!(body["error"], "No file uploaded");
  }

  #[tokio::test]
  async fn predict_error_falls_back_to_html_without_accept_header() {
    let (state, _uploads) = make_state().await;

    let resp = predict(state, vec![], Some("Jane Doe"), None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let ct = resp
      .headers()
      .get(header::CONTENT_TYPE)
      .unwrap()
      .to_str()
      .unwrap()
      .to_string();
    assert!(ct.contains("text/html"), "Content-Type: {ct}");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let html = std::str::from_utf8(&bytes).unwrap();
    assert!(html.contains("No file uploaded"), "body: {html}");
  }

  // ── /predict happy paths ────────────────────────────────────────────────────

  #[tokio::test]
  async fn predict_png_succeeds_and_persists_a_row() {
    let (state, _uploads) = make_state().await;
    let png = png_bytes();

    let resp = predict(
      state.clone(),
      vec![(header::ACCEPT, "application/json")],
      Some("Jane Doe"),
      Some(("scan.png", png.as_slice())),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;

    let label = body["label"].as_str().unwrap();
    assert!(label == "Normal" || label == "Fractured", "label: {label}");
    assert_eq!(body["patient_name"], "Jane Doe");
    let pct = body["confidence_pct"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&pct), "confidence_pct: {pct}");
    let image_path = body["image_path"].as_str().unwrap();
    assert!(image_path.starts_with("/static/uploads/"));
    assert!(image_path.ends_with(".png"));
    assert!(body["inference_time"].as_f64().unwrap() >= 0.0);

    let rows = state.store.recent(10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].scan_id, body["id"].as_str().unwrap());
    assert_eq!(rows[0].patient_name, "Jane Doe");
  }

  #[tokio::test]
  async fn predict_webp_stores_a_png_and_no_webp_remains() {
    let (state, uploads) = make_state().await;
    let webp = webp_bytes();

    let resp = predict(
      state,
      vec![(header::ACCEPT, "application/json")],
      Some("Jane Doe"),
      Some(("sample.webp", webp.as_slice())),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_of(resp).await;
    assert!(body["image_path"].as_str().unwrap().ends_with(".png"));

    let entries: Vec<_> = std::fs::read_dir(uploads.path())
      .unwrap()
      .filter_map(|e| e.ok())
      .map(|e| e.path())
      .collect();
    assert_eq!(entries.len(), 1, "upload dir: {entries:?}");
    assert!(entries[0].extension().is_some_and(|x| x == "png"));
  }

  #[tokio::test]
  async fn predict_accepts_uppercase_extensions() {
    let (state, _uploads) = make_state().await;
    let png = png_bytes();

    let resp = predict(
      state,
      vec![(header::ACCEPT, "application/json")],
      Some("Jane Doe"),
      Some(("SCAN.PNG", png.as_slice())),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn predict_renders_result_page_for_browsers() {
    let (state, _uploads) = make_state().await;
    let png = png_bytes();

    let resp = predict(
      state,
      vec![],
      Some("Jane Doe"),
      Some(("scan.png", png.as_slice())),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let html = std::str::from_utf8(&bytes).unwrap();
    assert!(html.contains("Diagnosis:"), "body: {html}");
    assert!(html.contains("Jane Doe"));
  }

  // ── /api ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn stats_endpoint_on_empty_store() {
    let (state, _uploads) = make_state().await;

    let req = Request::builder()
      .uri("/api/stats")
      .body(Body::empty())
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_of(resp).await;
    assert_eq!(body["total_scans"], 0);
    assert_eq!(body["fractures"], 0);
    assert!(body["avg_latency"].is_null());
    assert!(body["model_accuracy"].is_null());
    assert_eq!(body["labelled_count"], 0);
  }

  #[tokio::test]
  async fn recent_endpoint_returns_rows_newest_first() {
    let (state, _uploads) = make_state().await;
    let png = png_bytes();

    let resp = predict(
      state.clone(),
      vec![(header::ACCEPT, "application/json")],
      Some("Jane Doe"),
      Some(("scan.png", png.as_slice())),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
      .uri("/api/recent?n=5")
      .body(Body::empty())
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_of(resp).await;
    let rows = body["recent"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["patient_name"], "Jane Doe");
    assert!(rows[0]["scan_id"].as_str().unwrap().starts_with('A'));
  }

  // ── /download_report ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn download_report_with_missing_image_is_still_a_pdf_attachment() {
    let (state, _uploads) = make_state().await;

    let req = Request::builder()
      .uri(
        "/download_report?prediction=Fractured&accuracy=87.65\
         &image_path=/static/uploads/gone.png&patient_name=Jane%20Doe",
      )
      .body(Body::empty())
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(
      resp.headers().get(header::CONTENT_TYPE).unwrap(),
      "application/pdf"
    );
    let disposition = resp
      .headers()
      .get(header::CONTENT_DISPOSITION)
      .unwrap()
      .to_str()
      .unwrap();
    assert!(disposition.contains("xray_report.pdf"), "{disposition}");

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
  }

  #[tokio::test]
  async fn download_report_accepts_urlencoded_post() {
    let (state, _uploads) = make_state().await;

    let req = Request::builder()
      .method("POST")
      .uri("/download_report")
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from(
        "prediction=Normal&accuracy=91.2&patient_name=Jane+Doe",
      ))
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
  }

  // ── Dashboard ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn index_serves_the_dashboard() {
    let (state, _uploads) = make_state().await;

    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let html = std::str::from_utf8(&bytes).unwrap();
    assert!(html.contains("multipart/form-data"));
    assert!(html.contains("patient_name"));
  }
}
