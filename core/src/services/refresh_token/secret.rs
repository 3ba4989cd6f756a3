//! Secret representation at rest and constant-time verification

use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};

use rk_shared::config::SecretStorage;

/// Representation of `secret` that gets persisted
pub fn encode_secret(storage: SecretStorage, secret: &str) -> String {
    match storage {
        SecretStorage::Verbatim => secret.to_string(),
        SecretStorage::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(secret.as_bytes());
            hex::encode(hasher.finalize())
        }
    }
}

/// Compare a presented secret against its stored representation
///
/// Runs in time independent of where the inputs first differ.
pub fn secret_matches(storage: SecretStorage, stored: &str, presented: &str) -> bool {
    let encoded = encode_secret(storage, presented);
    constant_time_eq(stored.as_bytes(), encoded.as_bytes())
}
