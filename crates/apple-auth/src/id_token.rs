//! Identity token decoding
//!
//! Reads the claims out of the `id_token` returned by the token endpoint.
//! The signature is NOT verified here: the token arrives directly from
//! Apple over TLS in response to our own authenticated request. Verifying
//! it against Apple's published JWKS would close that gap.

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::PRIVATE_RELAY_DOMAIN;
use crate::error::{Error, Result};

/// Claims of an Apple identity token that the callback consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Stable, team-scoped user identifier
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub email_verified: Option<bool>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_private_email: Option<bool>,
    #[serde(default)]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl IdentityClaims {
    /// Unix seconds of authentication, falling back to issue time.
    pub fn authenticated_at(&self) -> Option<i64> {
        self.auth_time.or(self.iat)
    }
}

/// Apple encodes boolean claims as either JSON booleans or `"true"`/`"false"`.
fn flexible_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    Ok(match Option::<BoolOrString>::deserialize(deserializer)? {
        Some(BoolOrString::Bool(b)) => Some(b),
        Some(BoolOrString::Str(s)) => Some(s.eq_ignore_ascii_case("true")),
        None => None,
    })
}

/// Read the claims of a compact JWT without checking its signature.
pub fn decode_id_token(token: &str) -> Result<IdentityClaims> {
    jsonwebtoken::dangerous::insecure_decode::<IdentityClaims>(token)
        .map(|data| data.claims)
        .map_err(|e| Error::IdToken(format!("not a readable identity token: {e}")))
}

/// Whether `email` is an Apple private relay address.
pub fn is_private_relay_email(email: &str) -> bool {
    email
        .rsplit_once('@')
        .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(PRIVATE_RELAY_DOMAIN))
}
