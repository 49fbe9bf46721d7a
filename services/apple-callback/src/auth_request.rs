//! Normalized authentication record relayed to the upstream backend

use std::fmt;

use apple_auth::{IdentityClaims, TokenResponse, is_private_relay_email};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Body of `POST /auth/apple/callback` as sent by the frontend.
///
/// `user` is only present on the first sign-in and may arrive either as an
/// object or as a JSON-encoded string.
#[derive(Default, Deserialize)]
pub struct CallbackRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct UserFragment {
    name: Option<UserName>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserName {
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Display name from the frontend's user fragment.
///
/// Unparsable fragments are logged and treated as absent.
pub fn parse_user_name(user: Option<&serde_json::Value>) -> Option<String> {
    let user = user?;
    let fragment = match user {
        serde_json::Value::String(raw) => serde_json::from_str::<UserFragment>(raw),
        other => serde_json::from_value::<UserFragment>(other.clone()),
    };

    let name = match fragment {
        Ok(fragment) => fragment.name?,
        Err(e) => {
            warn!(error = %e, "failed to parse user data");
            return None;
        }
    };

    let full = format!(
        "{} {}",
        name.first_name.unwrap_or_default(),
        name.last_name.unwrap_or_default()
    );
    let full = full.trim();
    (!full.is_empty()).then(|| full.to_owned())
}

/// Record the upstream backend persists or validates.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub apple_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_private_email: bool,
    pub refresh_token: Option<String>,
    pub access_token: String,
    pub email_verified: bool,
    /// RFC 3339, millisecond precision, UTC
    pub auth_time: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub state: Option<String>,
}

impl AuthRequest {
    pub fn new(
        claims: &IdentityClaims,
        tokens: &TokenResponse,
        name: Option<String>,
        state: Option<String>,
    ) -> Self {
        let is_private_email = claims
            .email
            .as_deref()
            .is_some_and(is_private_relay_email);

        let auth_time = claims
            .authenticated_at()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true));

        Self {
            apple_id: claims.sub.clone(),
            email: claims.email.clone(),
            name,
            is_private_email,
            refresh_token: tokens.refresh_token.clone(),
            access_token: tokens.access_token.clone(),
            email_verified: claims.email_verified.unwrap_or(false),
            auth_time,
            token_type: tokens.token_type.clone(),
            expires_in: tokens.expires_in,
            state,
        }
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("apple_id", &self.apple_id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("is_private_email", &self.is_private_email)
            .field("email_verified", &self.email_verified)
            .field("auth_time", &self.auth_time)
            .finish_non_exhaustive()
    }
}
