//! Password hashing.
//!
//! New hashes use the configured scheme; verification always uses the scheme
//! recorded next to the stored hash. Both schemes are CPU-bound and run on the
//! blocking pool.

use std::fmt;
use std::str::FromStr;

use argon2::{
    password_hash::{PasswordHasher as _, PasswordVerifier as _, SaltString},
    Argon2, PasswordHash,
};
use rand::rngs::OsRng;

use super::domain::Credential;
use super::errors::AuthError;

pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordAlgorithm {
    #[default]
    Bcrypt,
    Argon2,
}

impl PasswordAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordAlgorithm::Bcrypt => "bcrypt",
            PasswordAlgorithm::Argon2 => "argon2",
        }
    }
}

impl fmt::Display for PasswordAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasswordAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bcrypt" => Ok(PasswordAlgorithm::Bcrypt),
            "argon2" => Ok(PasswordAlgorithm::Argon2),
            other => Err(AuthError::Hash(format!("unsupported password algorithm: {other}"))),
        }
    }
}

/// Scheme and cost used for new hashes.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub algorithm: PasswordAlgorithm,
    pub bcrypt_cost: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { algorithm: PasswordAlgorithm::Bcrypt, bcrypt_cost: DEFAULT_BCRYPT_COST }
    }
}

impl PasswordPolicy {
    /// Hash `password` with a fresh salt.
    pub async fn hash(&self, password: &str) -> Result<Credential, AuthError> {
        let password = password.to_owned();
        let policy = *self;
        let password_hash = tokio::task::spawn_blocking(move || policy.hash_blocking(&password))
            .await
            .map_err(|e| AuthError::Hash(format!("hash task failed: {e}")))??;
        Ok(Credential { password_hash, algorithm: self.algorithm })
    }

    fn hash_blocking(&self, password: &str) -> Result<String, AuthError> {
        match self.algorithm {
            PasswordAlgorithm::Bcrypt => {
                bcrypt::hash(password, self.bcrypt_cost).map_err(|e| AuthError::Hash(e.to_string()))
            }
            PasswordAlgorithm::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|h| h.to_string())
                    .map_err(|e| AuthError::Hash(e.to_string()))
            }
        }
    }
}

/// Check `password` against a stored credential. `Ok(false)` means mismatch;
/// `Err` means the stored hash could not be processed.
pub async fn verify(password: &str, credential: &Credential) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let credential = credential.clone();
    tokio::task::spawn_blocking(move || verify_blocking(&password, &credential))
        .await
        .map_err(|e| AuthError::Hash(format!("verify task failed: {e}")))?
}

fn verify_blocking(password: &str, credential: &Credential) -> Result<bool, AuthError> {
    match credential.algorithm {
        PasswordAlgorithm::Bcrypt => {
            bcrypt::verify(password, &credential.password_hash).map_err(|e| AuthError::Hash(e.to_string()))
        }
        PasswordAlgorithm::Argon2 => {
            let parsed = PasswordHash::new(&credential.password_hash).map_err(|e| AuthError::Hash(e.to_string()))?;
            Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        }
    }
}
