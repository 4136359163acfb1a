//! One-way credential hashing.
//!
//! The hashing algorithm is pluggable behind [`CredentialHasher`]; the
//! shipped implementation is Argon2id with the library's default
//! parameters. Hashing is CPU-bound, so flows offload calls through
//! `tokio::task::spawn_blocking` rather than invoking the trait on a
//! request-handling thread.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params,
};
use http::StatusCode;

use crate::errors::SecurityError;

pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, SecurityError>;

    /// Constant-time verification. `Ok(false)` means the password does not
    /// match; `Err` means the stored hash itself is unusable.
    fn verify(&self, stored: &str, password: &str) -> Result<bool, SecurityError>;

    /// Whether the stored hash was produced with an outdated scheme and
    /// should be re-hashed on the next successful login.
    fn needs_rehash(&self, stored: &str) -> bool;
}

/// Argon2id with default parameters and a per-hash random salt.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, SecurityError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                SecurityError::credentials(
                    format!("Failed to hash password: {e}"),
                    StatusCode::BAD_REQUEST,
                )
            })
    }

    fn verify(&self, stored: &str, password: &str) -> Result<bool, SecurityError> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| SecurityError::storage(anyhow::anyhow!("invalid stored hash: {e}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(SecurityError::storage(anyhow::anyhow!(
                "password verification failed: {e}"
            ))),
        }
    }

    fn needs_rehash(&self, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return true;
        };
        if Algorithm::try_from(parsed.algorithm) != Ok(Algorithm::Argon2id) {
            return true;
        }
        let Ok(params) = Params::try_from(&parsed) else {
            return true;
        };
        params.m_cost() != Params::DEFAULT_M_COST
            || params.t_cost() != Params::DEFAULT_T_COST
            || params.p_cost() != Params::DEFAULT_P_COST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("correct-horse-battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(&hash, "correct-horse-battery").unwrap());
        assert!(!hasher.verify(&hash, "wrong-password").unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let hasher = Argon2Hasher;
        let one = hasher.hash("password123").unwrap();
        let two = hasher.hash("password123").unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn fresh_hash_needs_no_rehash() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("password123").unwrap();
        assert!(!hasher.needs_rehash(&hash));
    }

    #[test]
    fn outdated_parameters_need_rehash() {
        // m=4096 is below the current default cost.
        let weak_params = Params::new(4096, 3, 1, None).unwrap();
        let weak = Argon2::new(Algorithm::Argon2id, argon2::Version::V0x13, weak_params);
        let salt = SaltString::generate(&mut OsRng);
        let hash = weak
            .hash_password(b"password123", &salt)
            .unwrap()
            .to_string();

        let hasher = Argon2Hasher;
        assert!(hasher.needs_rehash(&hash));
        assert!(hasher.verify(&hash, "password123").unwrap());
    }

    #[test]
    fn garbage_hash_needs_rehash_and_fails_verification() {
        let hasher = Argon2Hasher;
        assert!(hasher.needs_rehash("not-a-hash"));
        assert!(hasher.verify("not-a-hash", "password123").is_err());
    }
}
