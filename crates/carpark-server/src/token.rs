//! Bearer token hashing and generation.
//!
//! Only the SHA-256 digest of a token is ever stored or compared.

use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `token`, as stored in the `users` table.
pub fn hash_token(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// A fresh random token: 32 bytes from the OS RNG, hex-encoded.
pub fn generate_token() -> String {
  let mut buf = [0u8; 32];
  OsRng.fill_bytes(&mut buf);
  hex::encode(buf)
}
