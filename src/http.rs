//! HTTP plumbing shared by the OpenAI-compatible chat and embedding clients.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

/// Client with a whole-request timeout; the only deadline a call gets.
pub(crate) fn client(timeout_seconds: u64) -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))
}

/// Pass a 2xx response through; otherwise read the body and describe it.
pub(crate) async fn success_or_message(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    Err(describe_http_error(status, &body))
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<Value>,
}

/// `HTTP <status>[ [code=..]]: <message>`, using the OpenAI error envelope
/// when the body carries one.
pub(crate) fn describe_http_error(status: StatusCode, body: &str) -> String {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return format!("HTTP {status}: {body}");
    };
    let code = match envelope.error.code {
        Some(Value::String(s)) => format!(" [code={s}]"),
        Some(Value::Null) | None => String::new(),
        Some(other) => format!(" [code={other}]"),
    };
    format!("HTTP {status}{code}: {}", envelope.error.message)
}
