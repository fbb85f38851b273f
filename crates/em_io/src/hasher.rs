//! crates/em_io/src/hasher.rs
//!
//! SHA-256 digests of the raw input files, recorded in the run summary so a
//! result can be traced back to the exact tables it came from.
//! Hex digests are lowercase.

#![forbid(unsafe_code)]

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Digests of the three input tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputDigests {
    pub vacancies_sha256: String,
    pub preferences_sha256: String,
    pub ratings_sha256: String,
}

/// Encode bytes as lowercase hex.
fn to_lower_hex(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(LUT[(b >> 4) as usize] as char);
        out.push(LUT[(b & 0x0F) as usize] as char);
    }
    out
}

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    to_lower_hex(&Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_encoding_is_lowercase() {
        let h = sha256_hex(b"abc");
        assert_eq!(h, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
