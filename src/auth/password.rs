use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;
use unicode_normalization::UnicodeNormalization;

/// Upper bound on password length, counted in characters after normalization.
pub const MAX_PASSWORD_CHARS: usize = 255;

// Argon2id parameters every new hash is produced with. Verification reads the
// parameters embedded in the stored hash instead, so old hashes keep working.
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be non-empty")]
    Empty,
    #[error("password must be at most 255 characters")]
    TooLong,
    #[error("password contains prohibited characters")]
    Prohibited,
    #[error("password hashing failed")]
    Hash,
}

/// Result of checking a password against a stored hash. `needs_rehash` is set
/// when the password matched but the stored hash uses a deprecated algorithm
/// or weaker-than-current parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub needs_rehash: bool,
}

impl Verification {
    fn denied() -> Self {
        Self {
            valid: false,
            needs_rehash: false,
        }
    }
}

// NFKC so that visually-identical passwords typed on different platforms
// compare equal. Control characters are rejected rather than silently dropped.
fn prepare(plain: &str) -> Result<String, PasswordError> {
    let prepared: String = plain.nfkc().collect();
    if prepared.chars().any(char::is_control) {
        return Err(PasswordError::Prohibited);
    }
    Ok(prepared)
}

fn argon2_config() -> Result<Argon2<'static>, password_hash::Error> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let prepared = prepare(plain)?;
    if prepared.is_empty() {
        return Err(PasswordError::Empty);
    }
    if prepared.chars().count() > MAX_PASSWORD_CHARS {
        return Err(PasswordError::TooLong);
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = argon2_config().map_err(|e| {
        error!(error = %e, "argon2 config error");
        PasswordError::Hash
    })?;
    let hash = argon2
        .hash_password(prepared.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash
        })?
        .to_string();
    Ok(hash)
}

/// Never fails: a malformed stored hash is treated as "no credential
/// configured" and denies the login instead of erroring out of it.
pub fn verify_password(plain: &str, stored_hash: &str) -> Verification {
    let Ok(prepared) = prepare(plain) else {
        return Verification::denied();
    };
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(hash) => hash,
        Err(_) => return Verification::denied(),
    };

    // The argon2 verifier re-derives the digest from the algorithm, salt, and
    // work factor embedded in the hash and compares the whole digest in
    // constant time.
    let valid = match argon2_config() {
        Ok(argon2) => argon2.verify_password(prepared.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    };

    Verification {
        valid,
        needs_rehash: valid && hash_is_outdated(&parsed),
    }
}

fn hash_is_outdated(parsed: &PasswordHash<'_>) -> bool {
    match Algorithm::try_from(parsed.algorithm) {
        Ok(Algorithm::Argon2id) => {}
        _ => return true,
    }
    match Params::try_from(parsed) {
        Ok(params) => params.m_cost() < MEMORY_COST_KIB || params.t_cost() < TIME_COST,
        Err(_) => true,
    }
}
