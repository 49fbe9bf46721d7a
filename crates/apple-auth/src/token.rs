//! Authorization code exchange against Apple's token endpoint
//!
//! The request is form-encoded and authenticated by a client secret minted
//! for this call only. No retry is attempted: a failed exchange is reported
//! to the caller immediately, with timeouts distinguished from other
//! transport failures.

use std::fmt;
use std::time::Duration;

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::provider::ProviderConfig;

/// Token endpoint response for an authorization code grant.
///
/// `expires_in` is a delta in seconds. `id_token` is optional on the wire
/// so its absence can be reported as a protocol failure rather than a
/// parse error.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_id_token", &self.id_token.is_some())
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// OAuth error body, e.g. `{"error":"invalid_grant","error_description":"..."}`
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!(
            "Apple token endpoint did not answer within {}ms",
            timeout.as_millis()
        ))
    } else {
        Error::Http(format!("token exchange request failed: {e}"))
    }
}

/// Exchange an authorization code for Apple tokens.
pub async fn exchange_code(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    code: &str,
    timeout: Duration,
) -> Result<TokenResponse> {
    let client_secret = provider.client_secret()?;
    debug!(endpoint = %provider.token_endpoint, "exchanging authorization code");

    let response = client
        .post(&provider.token_endpoint)
        .header(ACCEPT, "application/json")
        .form(&[
            ("client_id", provider.client_id.as_str()),
            ("client_secret", client_secret.expose().as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", provider.redirect_uri.as_str()),
        ])
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    if !status.is_success() {
        let reason = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error_description.or(b.error))
            .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
        warn!(%status, reason, "Apple token endpoint rejected the code");
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {reason}"
        )));
    }

    serde_json::from_slice::<TokenResponse>(&body)
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))
}
