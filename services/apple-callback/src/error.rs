//! Callback failure taxonomy
//!
//! Every failure in the callback flow ends up as one of these variants and is
//! turned into an HTTP response at the handler boundary. Nothing propagates
//! past the request and nothing is retried.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallbackError {
    /// Missing or unusable secrets
    #[error("{0}")]
    Configuration(String),

    #[error("Missing required parameter: authorization code")]
    MissingCode,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Apple token exchange failed: {0}")]
    Upstream(String),

    #[error("Apple token exchange timed out: {0}")]
    UpstreamTimeout(String),

    /// Identity token missing from or undecodable in the exchange result
    #[error("Failed to decode ID token from Apple: {0}")]
    Protocol(String),

    #[error("User already exists")]
    Conflict,

    #[error("Backend request timed out")]
    BackendTimeout,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl CallbackError {
    pub fn status(&self) -> StatusCode {
        match self {
            CallbackError::MissingCode | CallbackError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            CallbackError::Conflict => StatusCode::CONFLICT,
            CallbackError::UpstreamTimeout(_) | CallbackError::BackendTimeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
            CallbackError::Configuration(_)
            | CallbackError::Upstream(_)
            | CallbackError::Protocol(_)
            | CallbackError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label
    pub fn kind(&self) -> &'static str {
        match self {
            CallbackError::Configuration(_) => "configuration",
            CallbackError::MissingCode | CallbackError::InvalidBody(_) => "validation",
            CallbackError::Upstream(_) => "upstream",
            CallbackError::UpstreamTimeout(_) => "upstream_timeout",
            CallbackError::Protocol(_) => "protocol",
            CallbackError::Conflict => "conflict",
            CallbackError::BackendTimeout => "backend_timeout",
            CallbackError::Backend(_) => "backend",
        }
    }

    /// Which outbound call failed, if any.
    pub fn upstream_target(&self) -> Option<&'static str> {
        match self {
            CallbackError::Upstream(_) | CallbackError::UpstreamTimeout(_) => Some("apple"),
            CallbackError::Conflict | CallbackError::BackendTimeout | CallbackError::Backend(_) => {
                Some("backend")
            }
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.status() == StatusCode::BAD_REQUEST
    }

    /// `{success: false, message, error}` envelope returned to the frontend.
    pub fn body(&self) -> serde_json::Value {
        match self {
            CallbackError::MissingCode | CallbackError::InvalidBody(_) => serde_json::json!({
                "success": false,
                "message": self.to_string(),
                "error": self.to_string(),
            }),
            CallbackError::Configuration(_) => serde_json::json!({
                "success": false,
                "message": "Server configuration error",
                "error": self.to_string(),
            }),
            CallbackError::Conflict => serde_json::json!({
                "success": false,
                "message": "User already exists",
                "error": self.to_string(),
            }),
            CallbackError::BackendTimeout => serde_json::json!({
                "success": false,
                "message": "Backend service timeout",
                "error": "The authentication service is temporarily unavailable",
            }),
            CallbackError::UpstreamTimeout(_) => serde_json::json!({
                "success": false,
                "message": "Identity provider timeout",
                "error": "The authentication service is temporarily unavailable",
            }),
            CallbackError::Upstream(_) | CallbackError::Protocol(_) | CallbackError::Backend(_) => {
                serde_json::json!({
                    "success": false,
                    "message": "Authentication failed",
                    "error": self.to_string(),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })
            }
        }
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        (self.status(), axum::Json(self.body())).into_response()
    }
}

impl From<apple_auth::Error> for CallbackError {
    fn from(err: apple_auth::Error) -> Self {
        match err {
            apple_auth::Error::Configuration(msg) => {
                CallbackError::Configuration(format!("Failed to generate client secret: {msg}"))
            }
            apple_auth::Error::Timeout(msg) => CallbackError::UpstreamTimeout(msg),
            apple_auth::Error::Http(msg) | apple_auth::Error::TokenExchange(msg) => {
                CallbackError::Upstream(msg)
            }
            apple_auth::Error::IdToken(msg) => CallbackError::Protocol(msg),
        }
    }
}

impl From<JsonRejection> for CallbackError {
    fn from(rejection: JsonRejection) -> Self {
        CallbackError::InvalidBody(rejection.body_text())
    }
}
