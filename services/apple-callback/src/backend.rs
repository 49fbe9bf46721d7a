//! Upstream backend relay
//!
//! Posts the normalized `AuthRequest` as JSON. The backend sits behind an
//! ngrok tunnel in development, so the request carries the header that
//! skips ngrok's browser warning page.

use std::time::Duration;

use axum::http::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{error, info, instrument, warn};

use crate::auth_request::AuthRequest;
use crate::error::CallbackError;

const BACKEND_USER_AGENT: &str = "AppleAuth-Rust/1.0";

fn transport_error(e: reqwest::Error) -> CallbackError {
    if e.is_timeout() {
        CallbackError::BackendTimeout
    } else {
        CallbackError::Backend(e.to_string())
    }
}

/// `null`, `false`, `0` and `""` count as no answer at all.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

/// Send the auth record upstream and return the backend's JSON response.
#[instrument(skip_all, fields(url = %url))]
pub async fn notify(
    client: &reqwest::Client,
    url: &str,
    request: &AuthRequest,
    timeout: Duration,
) -> Result<serde_json::Value, CallbackError> {
    let response = client
        .post(url)
        .header(ACCEPT, "application/json")
        .header(USER_AGENT, BACKEND_USER_AGENT)
        .header("ngrok-skip-browser-warning", "true")
        .json(request)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            error!(error = %e, timeout = e.is_timeout(), "backend request failed");
            transport_error(e)
        })?;

    let status = response.status();
    let body = response.bytes().await.map_err(transport_error)?;

    if status == StatusCode::CONFLICT {
        warn!("backend reports user already exists");
        return Err(CallbackError::Conflict);
    }

    if !status.is_success() {
        let message = serde_json::from_slice::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| format!("backend returned {status}"));
        error!(%status, message, "backend rejected auth request");
        return Err(CallbackError::Backend(message));
    }

    // A 2xx body that is not JSON is passed through as a string.
    let data: serde_json::Value = serde_json::from_slice(&body).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
    });

    if !is_truthy(&data) {
        warn!(%status, "backend accepted auth request with an empty body");
        return Err(CallbackError::Backend("Empty response from backend".into()));
    }

    info!(%status, "backend accepted auth request");
    Ok(data)
}
