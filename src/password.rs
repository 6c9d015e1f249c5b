//! Password hashing and verification using bcrypt.

/// Errors from hashing a password. Never carries the plaintext.
#[derive(Debug, thiserror::Error)]
#[error("failed to hash password: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

/// Salted bcrypt hasher with a configurable cost factor.
pub struct PasswordHasher {
    cost: u32,
    /// Digest verified against when the account does not exist, so unknown
    /// users take as long to reject as wrong passwords.
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        let dummy_hash = bcrypt::hash("not-a-real-password", cost)?;
        Ok(Self { cost, dummy_hash })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// Verify a password against a stored digest.
    /// A malformed digest is treated the same as a mismatch.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        bcrypt::verify(password, digest).unwrap_or(false)
    }

    /// Burn one verification for a login against an unknown account.
    pub fn verify_dummy(&self, password: &str) -> bool {
        self.verify(password, &self.dummy_hash);
        false
    }
}
