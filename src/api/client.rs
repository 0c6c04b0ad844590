use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use yansi::Paint;

use crate::wizard::SubmissionError;

static SILENT: AtomicBool = AtomicBool::new(false);

pub fn set_silent(silent: bool) {
    SILENT.store(silent, Ordering::Relaxed);
}

fn log_output(msg: String) {
    if !SILENT.load(Ordering::Relaxed) {
        println!("{}", msg);
    }
}

/// Render the request as a curl command line, token masked.
fn curl_line(method: &str, url: &str, headers: &[(&str, String)], body: Option<&Value>) -> String {
    let mut parts = Vec::new();
    parts.push(Paint::new("curl").green().bold().to_string());
    parts.push(format!("-X {}", Paint::new(method).yellow().bold()));
    parts.push(format!("'{}'", Paint::new(url).cyan()));
    for (name, value) in headers {
        let shown = if *name == "API-Token" { "***" } else { value.as_str() };
        parts.push(format!(
            "{} {}",
            Paint::new("-H").magenta(),
            Paint::new(format!("'{}: {}'", name, shown)).magenta()
        ));
    }
    if let Some(b) = body {
        let json_str = serde_json::to_string(b).unwrap_or_default();
        parts.push(format!(
            "{} {}",
            Paint::new("-d").blue(),
            Paint::new(format!("'{}'", json_str.replace('\'', "'\\''"))).white()
        ));
    }
    parts.join(" ")
}

/// Core HTTP call against the provisioning API.
///
/// Non-2xx answers become [`SubmissionError::Rejected`] carrying the API's
/// `error`/`message` field when present; connection problems become
/// [`SubmissionError::Transport`].
pub async fn api_call(
    client: &reqwest::Client,
    api_base_url: &str,
    api_token: &str,
    method: &str,
    endpoint: &str,
    body: Option<Value>,
    extra_headers: &[(&str, String)],
) -> Result<Value, SubmissionError> {
    let url = format!("{}{}", api_base_url, endpoint);

    let mut headers: Vec<(&str, String)> = Vec::new();
    if !api_token.is_empty() {
        headers.push(("API-Token", api_token.to_string()));
    }
    headers.extend(extra_headers.iter().cloned());
    log_output(format!("Request:\n{}", curl_line(method, &url, &headers, body.as_ref())));

    let mut req = match method {
        "POST" => client.post(&url),
        "PUT" => client.put(&url),
        "DELETE" => client.delete(&url),
        _ => client.get(&url),
    };
    for (name, value) in &headers {
        req = req.header(*name, value.as_str());
    }
    if let Some(ref b) = body {
        req = req.json(b);
    }

    let resp = req.send().await.map_err(|e| {
        tracing::warn!(%url, error = %e, "Provisioning API unreachable");
        SubmissionError::Transport(e.to_string())
    })?;
    let status = resp.status();
    let payload: Value = resp
        .json()
        .await
        .unwrap_or_else(|_| serde_json::json!({"error": "Failed to parse response"}));

    let json_str = serde_json::to_string(&payload).unwrap_or_default();
    log_output(format!("Response ({}):\n{}", status.as_u16(), Paint::new(json_str).rgb(100, 100, 100)));

    if status.is_success() {
        Ok(payload)
    } else {
        Err(SubmissionError::Rejected(error_message(&payload, status.as_u16())))
    }
}

fn error_message(payload: &Value, status: u16) -> String {
    ["error", "message", "detail"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}
