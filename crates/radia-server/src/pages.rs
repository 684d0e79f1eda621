//! Minimal inline HTML pages for non-AJAX clients.
//!
//! Kept deliberately small: the JSON API is the primary surface and the
//! dashboard is expected to talk to it. No templating engine.

/// The dashboard: upload form, stats placeholders, optional error banner.
pub fn dashboard(error: Option<&str>) -> String {
  let banner = match error {
    Some(msg) => format!(r#"<p class="error">{}</p>"#, escape(msg)),
    None => String::new(),
  };

  format!(
    r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Radia — X-ray Triage</title></head>
<body>
<h1>X-ray Fracture Triage</h1>
{banner}
<form action="/predict" method="post" enctype="multipart/form-data">
  <label>Patient name <input type="text" name="patient_name" required></label>
  <label>X-ray image <input type="file" name="file" accept=".png,.jpg,.jpeg,.gif,.webp" required></label>
  <button type="submit">Analyze</button>
</form>
<section id="stats" data-src="/api/stats"></section>
<section id="recent" data-src="/api/recent?n=10"></section>
</body>
</html>
"#
  )
}

/// The result page rendered after a non-AJAX `/predict`.
pub fn result(
  prediction: &str,
  accuracy: f64,
  image_path: &str,
  doctor_note: &str,
  current_date: &str,
  patient_name: &str,
) -> String {
  format!(
    r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Scan Result</title></head>
<body>
<h1>Scan Result</h1>
<p>Date: {date}</p>
<p>Patient: {patient}</p>
<p>Diagnosis: <strong>{prediction}</strong></p>
<p>Confidence: {accuracy}%</p>
<img src="{image}" alt="X-ray scan" width="300">
<p><em>{note}</em></p>
<p><a href="/download_report?prediction={prediction_q}&accuracy={accuracy}&image_path={image_q}&patient_name={patient_q}&current_date={date_q}">Download PDF report</a></p>
</body>
</html>
"#,
    date = escape(current_date),
    patient = escape(patient_name),
    prediction = escape(prediction),
    accuracy = accuracy,
    image = escape(image_path),
    note = escape(doctor_note),
    prediction_q = urlencode(prediction),
    image_q = urlencode(image_path),
    patient_q = urlencode(patient_name),
    date_q = urlencode(current_date),
  )
}

fn escape(s: &str) -> String {
  s.chars()
    .map(|c| match c {
      '&' => "&amp;".to_string(),
      '<' => "&lt;".to_string(),
      '>' => "&gt;".to_string(),
      '"' => "&quot;".to_string(),
      '\'' => "&#39;".to_string(),
      c => c.to_string(),
    })
    .collect()
}

fn urlencode(s: &str) -> String {
  s.bytes()
    .map(|b| match b {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
        (b as char).to_string()
      }
      b => format!("%{b:02X}"),
    })
    .collect()
}
