//! Token verification seam.
//!
//! How tokens are minted and carried is the transport's business; the
//! session layer only asks which account a presented token belongs to,
//! and it asks before any engine access happens.

/// Resolves presented tokens to account names.
pub trait TokenVerifier: Send + Sync + 'static {
    /// Returns the account the token belongs to, or `None` when the
    /// token is missing, unknown, or expired.
    fn verify_token(&self, token: Option<&str>) -> Option<String>;

    /// Whether any credentials have been configured at all.
    fn is_set_up(&self) -> bool;
}

/// Verifier backed by a single configured token owned by one account.
pub struct StaticTokenVerifier {
    token: String,
    user: String,
}

impl StaticTokenVerifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self::for_user(token, "admin")
    }

    pub fn for_user(token: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: user.into(),
        }
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify_token(&self, token: Option<&str>) -> Option<String> {
        let token = token?;
        if !self.is_set_up() {
            return None;
        }
        constant_time_eq(self.token.as_bytes(), token.as_bytes()).then(|| self.user.clone())
    }

    fn is_set_up(&self) -> bool {
        !self.token.is_empty()
    }
}

/// Byte comparison that does not short-circuit on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
