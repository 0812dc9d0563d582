use crate::error::KeeperError;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

pub const IDENTITY_ID_BYTES: usize = 8;
pub const SESSION_ID_BYTES: usize = 16;
pub const APPLICATION_ID_BYTES: usize = 12;
pub const TOKEN_ID_BYTES: usize = 12;
pub const SECRET_BYTES: usize = 16;

/// Lower-case hex of `byte_len` bytes from the OS random source.
pub fn random_hex(byte_len: usize) -> Result<String, KeeperError> {
    let mut data = vec![0u8; byte_len];
    getrandom::getrandom(&mut data)?;
    Ok(hex::encode(data))
}

/// Salted Argon2id PHC string for `password`, computed on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, KeeperError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| KeeperError::Internal(format!("password hashing task failed: {e}")))?
}

/// False for a mismatch and for anything that is not a PHC string.
pub async fn verify_password(hash: &str, password: &str) -> Result<bool, KeeperError> {
    let (hash, password) = (hash.to_owned(), password.to_owned());
    tokio::task::spawn_blocking(move || verify_blocking(&hash, &password))
        .await
        .map_err(|e| KeeperError::Internal(format!("password check task failed: {e}")))
}

fn hash_blocking(password: &str) -> Result<String, KeeperError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)?;
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(phc)
}

fn verify_blocking(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
