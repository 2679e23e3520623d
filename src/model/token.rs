//! Access token handed over by the external auth flow

use std::fmt;

/// Bearer credential for API and player requests.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(<{} chars>)", self.0.len())
    }
}

/// Holds the single current token. No refresh or expiry tracking.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: Option<AccessToken>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty strings are treated as "no token"
    pub fn set(&mut self, token: AccessToken) {
        if token.secret().is_empty() {
            tracing::warn!("Ignoring empty access token");
            self.current = None;
        } else {
            self.current = Some(token);
        }
    }

    pub fn get(&self) -> Option<&AccessToken> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn is_set(&self) -> bool {
        self.current.is_some()
    }
}
