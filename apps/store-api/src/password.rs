//! Password and one-time code hashing.
//!
//! Everything secret is stored as an Argon2id PHC string: account passwords,
//! email verification codes and password-reset codes.
//!
//! Handlers use the `*_async` variants, which run Argon2 on tokio's blocking
//! pool so a request never stalls a runtime worker.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tokio::task;

use store_core::VERIFICATION_CODE_LENGTH;

use crate::auth::AuthError;

/// Characters in a password-reset code.
pub const RESET_CODE_LENGTH: usize = 8;

#[derive(Clone)]
pub struct PasswordService {
    hasher: Argon2<'static>,
}

impl Default for PasswordService {
    fn default() -> Self {
        PasswordService {
            hasher: Argon2::default(),
        }
    }
}

impl PasswordService {
    pub fn new(hasher: Argon2<'static>) -> Self {
        PasswordService { hasher }
    }

    /// Minimal cost parameters; hashes still verify with any instance.
    #[cfg(test)]
    pub fn fast() -> Self {
        use argon2::{Algorithm, Params, Version};
        let params = Params::new(Params::MIN_M_COST, 1, 1, None)
            .unwrap_or_else(|_| Params::default());
        PasswordService::new(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// False for a wrong secret and for a stored value that is not a PHC
    /// string.
    pub fn verify(&self, secret: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .hasher
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub async fn hash_async(&self, secret: &str) -> Result<String, AuthError> {
        let service = self.clone();
        let secret = secret.to_string();
        task::spawn_blocking(move || service.hash(&secret))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    pub async fn verify_async(&self, secret: &str, stored: &str) -> bool {
        self.find_match(secret, vec![stored.to_string()])
            .await
            .is_some()
    }

    /// Index of the first of `stored` that `secret` verifies against. The
    /// whole scan runs as one blocking task.
    pub async fn find_match(&self, secret: &str, stored: Vec<String>) -> Option<usize> {
        if stored.is_empty() {
            return None;
        }
        let service = self.clone();
        let secret = secret.to_string();
        task::spawn_blocking(move || stored.iter().position(|hash| service.verify(&secret, hash)))
            .await
            .ok()
            .flatten()
    }

    /// Six decimal digits, zero-padded.
    pub fn verification_code(&self) -> String {
        let value = OsRng.next_u64() % 10u64.pow(VERIFICATION_CODE_LENGTH as u32);
        format!("{value:0width$}", width = VERIFICATION_CODE_LENGTH)
    }

    /// Eight uppercase hex characters.
    pub fn reset_code(&self) -> String {
        format!("{:0width$X}", OsRng.next_u32(), width = RESET_CODE_LENGTH)
    }
}
