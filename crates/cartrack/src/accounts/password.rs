//! Salted, iterated SHA-256 password digests stored as `hex(salt)$hex(digest)`.

use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;
const ROUNDS: u32 = 4096;

pub(crate) fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!(
        "{}${}",
        hex::encode(salt),
        hex::encode(digest(&salt, password))
    )
}

/// Malformed stored values simply fail verification; they are never an
/// error surface.
pub(crate) fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };
    digest(&salt, password).as_slice() == expected.as_slice()
}

fn digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut round: [u8; 32] = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize()
        .into();
    for _ in 1..ROUNDS {
        round = Sha256::new()
            .chain_update(salt)
            .chain_update(round)
            .finalize()
            .into();
    }
    round
}
