//! Password hashing utilities

use bcrypt::{hash, verify};

/// Hash a password with an explicit bcrypt cost
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password_with_cost("hunter22", 4).unwrap();
        assert_ne!(hashed, "hunter22");
        assert!(verify_password("hunter22", &hashed).unwrap());
        assert!(!verify_password("hunter23", &hashed).unwrap());
    }

    #[test]
    fn verify_against_garbage_hash_errors() {
        assert!(verify_password("x", "not-a-bcrypt-hash").is_err());
    }
}
