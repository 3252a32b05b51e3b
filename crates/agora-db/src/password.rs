use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use rand::{Rng, distr::Alphanumeric};

use crate::{DbError, Result};

pub const RESET_TOKEN_LEN: usize = 64;

/// Hash with Argon2id and a fresh salt. The PHC string is stored
/// hex-encoded.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Validation(format!("password hashing failed: {}", e)))?
        .to_string();
    Ok(hex::encode(hash))
}

/// Check `password` against a value produced by `hash_password`.
/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(bytes) = hex::decode(stored) else {
        return false;
    };
    let Ok(phc) = String::from_utf8(bytes) else {
        return false;
    };
    let Ok(parsed) = PasswordHash::new(&phc) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// 64 characters from [0-9a-zA-Z], drawn from the thread-local CSPRNG.
pub fn generate_reset_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}
