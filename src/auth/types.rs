//! Authentication identity types.

/// Verified identity placed in request extensions by `require_auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Username taken from the access token's `sub` claim
    pub username: String,
}
