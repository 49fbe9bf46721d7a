//! Error types for Apple sign-in operations

/// Errors from client secret minting, token exchange and id token decoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid id token: {0}")]
    IdToken(String),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

/// Result alias for Apple auth operations.
pub type Result<T> = std::result::Result<T, Error>;
