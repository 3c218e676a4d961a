// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document fingerprints: SHA-256 over persisted bytes.

use blattwerk_core::error::{BlattwerkError, Result};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Check `data` against an expected hex digest (case-insensitive).
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<()> {
    let actual = hash_bytes(data);
    if actual.eq_ignore_ascii_case(expected_hex.trim()) {
        Ok(())
    } else {
        Err(BlattwerkError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// FIPS 180-2 test vector for "abc".
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn digest_matches_published_vector() {
        assert_eq!(hash_bytes(b"abc"), ABC_SHA256);
    }

    #[test]
    fn verify_accepts_uppercase_digest() {
        assert!(verify_hash(b"abc", &ABC_SHA256.to_uppercase()).is_ok());
    }

    #[test]
    fn verify_reports_both_digests_on_mismatch() {
        match verify_hash(b"abd", ABC_SHA256) {
            Err(BlattwerkError::IntegrityMismatch { expected, actual }) => {
                assert_eq!(expected, ABC_SHA256);
                assert_eq!(actual, hash_bytes(b"abd"));
            }
            other => panic!("expected a mismatch, got {other:?}"),
        }
    }
}
