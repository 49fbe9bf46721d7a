//! Sign in with Apple server-side primitives
//!
//! Mints the ES256 client secret Apple's token endpoint requires, exchanges
//! an authorization code for tokens, and decodes the returned identity token.
//! Nothing here keeps state between calls: a fresh client secret is signed
//! for every exchange and no token is stored.
//!
//! Flow:
//! 1. `ProviderConfig::client_secret()` signs a JWT with the team's private key
//! 2. `token::exchange_code()` posts the code and secret to Apple
//! 3. `id_token::decode_id_token()` reads the identity claims from the response

pub mod client_secret;
pub mod constants;
pub mod error;
pub mod id_token;
pub mod provider;
pub mod token;

pub use client_secret::{ClientSecretClaims, generate_client_secret, normalize_private_key};
pub use constants::*;
pub use error::{Error, Result};
pub use id_token::{IdentityClaims, decode_id_token, is_private_relay_email};
pub use provider::ProviderConfig;
pub use token::{TokenResponse, exchange_code};

#[cfg(test)]
pub(crate) mod test_keys;
