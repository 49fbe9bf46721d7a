//! Sign in with Apple constants

/// Audience of the minted client secret and issuer of Apple identity tokens
pub const APPLE_AUDIENCE: &str = "https://appleid.apple.com";

/// Token endpoint for authorization code exchange
pub const TOKEN_ENDPOINT: &str = "https://appleid.apple.com/auth/token";

/// Scopes requested by the web sign-in button
pub const DEFAULT_SCOPE: &str = "name email";

/// Domain of the forwarding addresses Apple hands out when the user hides their email
pub const PRIVATE_RELAY_DOMAIN: &str = "privaterelay.appleid.com";

/// Client secret lifetime: six 30-day months. Apple rejects anything past six months.
pub const CLIENT_SECRET_TTL_SECS: u64 = 6 * 30 * 24 * 60 * 60;
