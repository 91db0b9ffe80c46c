use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;

use crate::error::{AppError, AppResult};

/// One-way hash shared by login credentials and cash-out codes.
pub fn hash_secret(secret: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

/// `false` for a mismatch or for a stored value that is not a valid hash.
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_secret`] on the blocking pool, keeping argon2 off the async workers.
pub async fn hash_secret_blocking(secret: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_secret(&secret))
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::from(e)))?
}

/// [`verify_secret`] on the blocking pool.
pub async fn verify_secret_blocking(secret: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_secret(&secret, &hash))
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::from(e)))
}
