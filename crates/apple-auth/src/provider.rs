//! Static Sign in with Apple client settings

use std::time::{SystemTime, UNIX_EPOCH};

use common::Secret;

use crate::client_secret::generate_client_secret;
use crate::constants::{DEFAULT_SCOPE, TOKEN_ENDPOINT};
use crate::error::Result;

/// Identifies this service to Apple. Loaded once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Services ID, e.g. `com.example.web`
    pub client_id: String,
    pub team_id: String,
    /// Key ID of the Sign in with Apple private key
    pub key_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub token_endpoint: String,
    pub private_key: Option<Secret<String>>,
}

impl ProviderConfig {
    pub fn new(
        client_id: impl Into<String>,
        team_id: impl Into<String>,
        key_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            team_id: team_id.into(),
            key_id: key_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: DEFAULT_SCOPE.to_owned(),
            token_endpoint: TOKEN_ENDPOINT.to_owned(),
            private_key: None,
        }
    }

    pub fn with_private_key(mut self, private_key: Secret<String>) -> Self {
        self.private_key = Some(private_key);
        self
    }

    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    /// Sign a fresh client secret stamped with the current time.
    pub fn client_secret(&self) -> Result<Secret<String>> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        generate_client_secret(
            &self.team_id,
            &self.client_id,
            &self.key_id,
            self.private_key.as_ref(),
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::test_keys::PRIVATE_KEY_PEM;

    #[test]
    fn defaults_point_at_apple() {
        let provider = ProviderConfig::new("com.example.web", "TEAM", "KEY", "https://example.com/cb");
        assert_eq!(provider.token_endpoint, "https://appleid.apple.com/auth/token");
        assert_eq!(provider.scope, "name email");
        assert!(provider.private_key.is_none());
    }

    #[test]
    fn client_secret_without_key_fails() {
        let provider = ProviderConfig::new("com.example.web", "TEAM", "KEY", "https://example.com/cb");
        assert!(matches!(
            provider.client_secret(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn client_secret_with_key_succeeds() {
        let provider = ProviderConfig::new("com.example.web", "TEAM", "KEY", "https://example.com/cb")
            .with_private_key(Secret::new(PRIVATE_KEY_PEM.to_string()));
        let secret = provider.client_secret().unwrap();
        assert_eq!(secret.expose().split('.').count(), 3);
    }

    #[test]
    fn debug_does_not_leak_private_key() {
        let provider = ProviderConfig::new("com.example.web", "TEAM", "KEY", "https://example.com/cb")
            .with_private_key(Secret::new(PRIVATE_KEY_PEM.to_string()));
        let debug = format!("{provider:?}");
        assert!(!debug.contains("MIGHAgEA"), "got: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}
