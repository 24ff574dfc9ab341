//! # Credentials
//!
//! Argon2 password hashing. Only PHC strings are ever stored.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{DbError, DbResult};

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::Internal(format!("password hashing failed: {e}")))
}

/// Checks `password` against a stored PHC string.
///
/// A malformed hash counts as a mismatch, so callers can answer it like
/// any other failed login.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verifies() {
        let hash = hash_password("doctor123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("doctor123", &hash));
        assert!(!verify_password("doctor124", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_is_mismatch() {
        assert!(!verify_password("admin123", "admin123"));
        assert!(!verify_password("", ""));
    }
}
