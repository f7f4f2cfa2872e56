//! Error types for the migration runner
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for migration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the migration runner
#[derive(Error, Debug)]
pub enum Error {
    /// Credentials were rejected by a provider
    ///
    /// Fatal when raised during preflight.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Provider-specific error (record invalid, quota, server error, ...)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message reported by the provider
        message: String,
    },

    /// The target already manages a zone for this domain
    #[error("Zone already exists: {0}")]
    ZoneExists(String),

    /// Resource not found at the provider
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The state store has no zone for a domain a step needs
    #[error("No zone recorded for {0}; run add-zones first")]
    MissingZone(String),

    /// State store-related errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O errors (state file, terminal)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a "zone exists" error
    pub fn zone_exists(domain: impl Into<String>) -> Self {
        Self::ZoneExists(domain.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a missing-zone error
    pub fn missing_zone(domain: impl Into<String>) -> Self {
        Self::MissingZone(domain.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error means the credentials were rejected
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_names_the_provider() {
        let err = Error::provider("cloudflare", "Invalid record content");
        assert_eq!(
            err.to_string(),
            "Provider error (cloudflare): Invalid record content"
        );
    }

    #[test]
    fn only_authentication_is_auth() {
        assert!(Error::auth("bad token").is_auth());
        assert!(!Error::missing_zone("example.com").is_auth());
    }
}
