//! Session identity issued by the upstream authentication provider.

use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;

/// Opaque session token. Only its presence matters to the engine.
#[derive(Clone)]
pub struct SessionToken(Secret<String>);

impl SessionToken {
    /// Returns `None` for an empty or whitespace-only token.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(Secret::new(raw)))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Session reference: token plus the subject it was issued for.
#[derive(Debug, Clone)]
pub struct Identity {
    pub token: SessionToken,
    pub subject_id: Uuid,
}

impl Identity {
    pub fn new(token: SessionToken, subject_id: Uuid) -> Self {
        Self { token, subject_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_absent() {
        assert!(SessionToken::new("").is_none());
        assert!(SessionToken::new("   ").is_none());
        assert!(SessionToken::new("abc").is_some());
    }

    #[test]
    fn debug_output_never_contains_the_token() {
        let token = SessionToken::new("very-secret-token").unwrap();
        let identity = Identity::new(token, Uuid::new_v4());
        let rendered = format!("{:?}", identity);
        assert!(!rendered.contains("very-secret-token"));
        assert_eq!(identity.token.expose(), "very-secret-token");
    }
}
