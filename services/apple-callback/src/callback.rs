//! Sign in with Apple callback orchestration
//!
//! One request walks these stages in order:
//!
//! `Received -> Validated -> TokenExchanged -> ClaimsDecoded -> BackendNotified -> Responded`
//!
//! Any stage may fail into `Errored`. The stage reached is recorded on the
//! request span so a failure log says how far the flow got. There are two
//! suspension points (Apple, then the backend) and no shared mutable state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use apple_auth::ProviderConfig;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use tracing::{Span, debug, error, info, instrument};

use crate::auth_request::{AuthRequest, CallbackRequest, parse_user_name};
use crate::backend;
use crate::config::ResponseMode;
use crate::error::CallbackError;
use crate::metrics;
use crate::redirect::{error_redirect_url, success_redirect_url};

/// Immutable per-process state shared by every callback
#[derive(Clone)]
pub struct CallbackState {
    pub client: reqwest::Client,
    pub provider: Arc<ProviderConfig>,
    pub provider_timeout: Duration,
    pub backend_url: Option<String>,
    pub backend_timeout: Duration,
    pub frontend_url: String,
    pub response_mode: ResponseMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    TokenExchanged,
    ClaimsDecoded,
    BackendNotified,
    Responded,
    Errored,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::TokenExchanged => "token_exchanged",
            Stage::ClaimsDecoded => "claims_decoded",
            Stage::BackendNotified => "backend_notified",
            Stage::Responded => "responded",
            Stage::Errored => "errored",
        }
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    *stage = next;
    Span::current().record("stage", next.as_str());
}

/// Run the callback flow and turn the outcome into a response.
#[instrument(skip_all, fields(request_id = %request_id, stage = Stage::Received.as_str()))]
pub async fn handle(
    state: &CallbackState,
    payload: Result<CallbackRequest, CallbackError>,
    request_id: String,
) -> Response {
    let started = Instant::now();
    let mut stage = Stage::Received;

    let (outcome, response) = match run(state, payload, &mut stage).await {
        Ok(data) => {
            advance(&mut stage, Stage::Responded);
            ("success", success_response(state, data))
        }
        Err(err) => {
            let failed_at = stage;
            advance(&mut stage, Stage::Errored);
            error!(
                failed_at = failed_at.as_str(),
                kind = err.kind(),
                error = %err,
                "apple auth callback failed"
            );
            if let Some(target) = err.upstream_target() {
                metrics::record_upstream_error(target, err.kind());
            }
            (err.kind(), error_response(state, err))
        }
    };

    metrics::record_callback(outcome, started.elapsed().as_secs_f64());
    response
}

async fn run(
    state: &CallbackState,
    payload: Result<CallbackRequest, CallbackError>,
    stage: &mut Stage,
) -> Result<serde_json::Value, CallbackError> {
    let request = payload?;
    info!(
        has_code = request.code.is_some(),
        has_id_token = request.id_token.is_some(),
        has_user = request.user.is_some(),
        state = ?request.state,
        "received apple auth callback"
    );

    let code = request
        .code
        .as_deref()
        .filter(|code| !code.trim().is_empty())
        .ok_or(CallbackError::MissingCode)?;
    let backend_url = state.backend_url.as_deref().ok_or_else(|| {
        CallbackError::Configuration("BACKEND_URL environment variable is not set".into())
    })?;
    advance(stage, Stage::Validated);

    let tokens =
        apple_auth::exchange_code(&state.client, &state.provider, code, state.provider_timeout)
            .await?;
    advance(stage, Stage::TokenExchanged);
    info!("apple token exchange successful");

    let id_token = tokens.id_token.as_deref().ok_or_else(|| {
        CallbackError::Protocol("token response did not include an id_token".into())
    })?;
    let claims = apple_auth::decode_id_token(id_token)?;
    advance(stage, Stage::ClaimsDecoded);
    debug!(
        sub = %claims.sub,
        email = ?claims.email,
        email_verified = ?claims.email_verified,
        "decoded id token without signature verification"
    );

    let auth_request = AuthRequest::new(
        &claims,
        &tokens,
        parse_user_name(request.user.as_ref()),
        request.state,
    );
    info!(
        apple_id = %auth_request.apple_id,
        email = ?auth_request.email,
        name = ?auth_request.name,
        is_private_email = auth_request.is_private_email,
        "prepared auth request"
    );

    let data = backend::notify(&state.client, backend_url, &auth_request, state.backend_timeout)
        .await?;
    advance(stage, Stage::BackendNotified);
    Ok(data)
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

fn success_response(state: &CallbackState, data: serde_json::Value) -> Response {
    let redirect_url = success_redirect_url(&state.frontend_url, &data);
    match state.response_mode {
        ResponseMode::Json => (
            StatusCode::OK,
            axum::Json(serde_json::json!({
                "success": true,
                "data": data,
                "redirectUrl": redirect_url,
            })),
        )
            .into_response(),
        ResponseMode::Redirect => found(redirect_url),
    }
}

/// Validation errors always answer with JSON: there is nothing to show on a
/// landing page for a request that never started the flow.
fn error_response(state: &CallbackState, err: CallbackError) -> Response {
    match state.response_mode {
        ResponseMode::Redirect if !err.is_validation() => {
            found(error_redirect_url(&state.frontend_url, &err.to_string()))
        }
        _ => err.into_response(),
    }
}
