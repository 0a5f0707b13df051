//! Upload credential resolution
//!
//! The bearer token is only needed when an upload is attempted. Staging never
//! touches it, so a missing token surfaces at upload time instead of startup.

use std::fmt;

use super::constants::DEFAULT_TOKEN_ENV;

/// Bearer token with a redacted `Debug` representation
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(****)")
    }
}

/// Where the upload bearer token comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Read from the named environment variable on every upload attempt
    Env(String),
    /// Fixed token supplied by the embedding program
    Static(BearerToken),
}

impl Default for TokenSource {
    fn default() -> Self {
        Self::Env(DEFAULT_TOKEN_ENV.to_string())
    }
}

impl TokenSource {
    /// Resolve the token. Empty values count as absent.
    pub fn resolve(&self) -> Option<BearerToken> {
        match self {
            Self::Env(var) => std::env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(BearerToken::new),
            Self::Static(token) if !token.expose().trim().is_empty() => Some(token.clone()),
            Self::Static(_) => None,
        }
    }

    /// Human-readable description for error messages (never the token itself)
    pub fn describe(&self) -> String {
        match self {
            Self::Env(var) => var.clone(),
            Self::Static(_) => "static token".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let token = BearerToken::new("super-secret");
        assert_eq!(format!("{:?}", token), "BearerToken(****)");
    }

    #[test]
    fn test_unset_env_resolves_none() {
        let source = TokenSource::Env("TRACERELAY_TEST_TOKEN_NEVER_SET_7f3a".to_string());
        assert!(source.resolve().is_none());
    }

    #[test]
    fn test_static_token_resolves() {
        let source = TokenSource::Static(BearerToken::new("abc"));
        assert_eq!(source.resolve().unwrap().expose(), "abc");
    }

    #[test]
    fn test_blank_static_token_is_absent() {
        let source = TokenSource::Static(BearerToken::new("  "));
        assert!(source.resolve().is_none());
    }

    #[test]
    fn test_default_reads_default_env() {
        assert_eq!(
            TokenSource::default(),
            TokenSource::Env(DEFAULT_TOKEN_ENV.to_string())
        );
        assert_eq!(TokenSource::default().describe(), DEFAULT_TOKEN_ENV);
    }
}
