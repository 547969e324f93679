//! Opaque bearer tokens. Clients hold the token; the database holds its SHA-256.

use sha2::{Digest, Sha256};

pub const TOKEN_LEN: usize = 32;

/// Generate a new random token of lowercase letters and digits
pub fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}

/// Hex SHA-256 of a token, the form stored in `sessions`
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
