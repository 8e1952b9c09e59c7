//! Password hashing helpers.
//!
//! Plaintext passwords exist only transiently inside the signup and login
//! handlers; only the bcrypt hash is ever persisted or logged.

/// Hashes a plaintext password with bcrypt at the default cost.
pub fn hash_password(plain: &str) -> Result<String, String> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST).map_err(|e| format!("Failed to hash password: {}", e))
}

/// Verifies a plaintext password against a stored bcrypt hash.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, String> {
    bcrypt::verify(plain, hash).map_err(|e| format!("Failed to verify password: {}", e))
}
