//! Content hashing and constant-time comparison helpers

use crate::{Error, Result};
use subtle::ConstantTimeEq;

/// A Blake3 digest (32 bytes)
pub type Hash = [u8; 32];

/// Integrity utilities used by archives and the reset gate
pub struct IntegrityUtils;

impl IntegrityUtils {
    /// Blake3 digest of `data`
    pub fn hash(data: &[u8]) -> Hash {
        blake3::hash(data).into()
    }

    /// Digest equality without early exit
    pub fn constant_time_eq(a: &Hash, b: &Hash) -> bool {
        a.ct_eq(b).into()
    }

    /// Compare a typed confirmation phrase against the expected one
    ///
    /// Exact byte match; no trimming or case folding.
    pub fn phrase_matches(supplied: &str, expected: &str) -> bool {
        supplied.as_bytes().ct_eq(expected.as_bytes()).into()
    }

    /// Lowercase hex form of a digest, as stored on archives
    pub fn hash_to_hex(hash: &Hash) -> String {
        hex::encode(hash)
    }

    /// Parse a stored hex digest back into bytes
    pub fn hex_to_hash(hex: &str) -> Result<Hash> {
        if hex.len() != 64 {
            return Err(Error::validation(format!(
                "Invalid hex length for hash: expected 64, got {}",
                hex.len()
            )));
        }

        let mut hash = [0u8; 32];
        hex::decode_to_slice(hex, &mut hash)
            .map_err(|e| Error::validation(format!("Invalid hex string: {e}")))?;
        Ok(hash)
    }
}
