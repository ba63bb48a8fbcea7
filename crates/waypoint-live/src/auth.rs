//! Bearer token handed over by the auth subsystem.

/// Opaque bearer token attached at handshake. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the handshake payload only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthToken").field(&"[REDACTED]").finish()
    }
}

impl From<String> for AuthToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for AuthToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let token = AuthToken::new("secret-jwt");
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret-jwt"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(token.expose(), "secret-jwt");
    }

    #[test]
    fn empty_token_is_detected() {
        assert!(AuthToken::new("").is_empty());
        assert!(!AuthToken::from("jwt").is_empty());
    }
}
