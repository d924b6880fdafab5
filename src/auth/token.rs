//! Bearer token type.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

/// An issued bearer token.
///
/// Immutable once minted. A token without an expiry is treated as needing a
/// refresh on every use.
#[derive(Clone)]
pub struct Token {
    value: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: SecretString::from(value.into()),
            expires_at,
        }
    }

    /// Token that expires `ttl` from now.
    pub fn expiring_in(value: impl Into<String>, ttl: Duration) -> Self {
        Self::new(value, Some(Utc::now() + ttl))
    }

    pub fn value(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Time left until expiry, `None` when unknown or already past.
    pub fn remaining(&self) -> Option<Duration> {
        let left = self.expires_at? - Utc::now();
        (left > Duration::zero()).then_some(left)
    }

    /// Check if token is past its expiry. Tokens without expiry never report expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Utc::now() >= exp)
            .unwrap_or(false)
    }

    /// Check if token is within `threshold` of expiry, or has no known expiry.
    pub fn needs_refresh(&self, threshold: Duration) -> bool {
        self.expires_at
            .map(|exp| Utc::now() + threshold >= exp)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_value() {
        let token = Token::expiring_in("super-secret", Duration::hours(1));
        let debug = format!("{:?}", token);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_no_expiry_always_needs_refresh() {
        let token = Token::new("t", None);
        assert!(token.needs_refresh(Duration::zero()));
        assert!(!token.is_expired());
        assert!(token.remaining().is_none());
    }

    #[test]
    fn test_threshold() {
        let token = Token::expiring_in("t", Duration::seconds(30));
        assert!(!token.is_expired());
        assert!(token.needs_refresh(Duration::seconds(60)));
        assert!(!token.needs_refresh(Duration::seconds(10)));
    }

    #[test]
    fn test_expired() {
        let token = Token::new("t", Some(Utc::now() - Duration::seconds(1)));
        assert!(token.is_expired());
        assert!(token.remaining().is_none());
    }

    #[test]
    fn test_remaining() {
        let token = Token::expiring_in("t", Duration::hours(1));
        let left = token.remaining().unwrap();
        assert!(left > Duration::minutes(59));
        assert_eq!(token.value(), "t");
    }
}
