// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One-way patient-identifier hashing, applied to submission claims
//! only when `ingestion.security.hashSensitive` is set. Remittance rows
//! never carry a patient identifier, so there is nothing to hash there.

use sha2::{Digest, Sha256};

/// Hashes `patient_identifier` with a per-deployment pepper so the
/// digest cannot be reversed by a rainbow table built from public
/// identifier formats. The pepper is a deployment secret, not a salt
/// stored alongside the row.
pub fn hash_patient_identifier(patient_identifier: &str, pepper: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pepper);
    hasher.update(patient_identifier.trim().to_ascii_uppercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// Applies [`hash_patient_identifier`] only when `hash_sensitive` is
/// true, otherwise returns the identifier unchanged.
pub fn maybe_hash(patient_identifier: String, hash_sensitive: bool, pepper: &[u8]) -> String {
    if hash_sensitive {
        hash_patient_identifier(&patient_identifier, pepper)
    } else {
        patient_identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_for_the_same_input() {
        let a = hash_patient_identifier("P123", b"pepper");
        let b = hash_patient_identifier("P123", b"pepper");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_case_and_whitespace_insensitive() {
        let a = hash_patient_identifier("p123", b"pepper");
        let b = hash_patient_identifier("  P123  ", b"pepper");
        assert_eq!(a, b);
    }

    #[test]
    fn different_peppers_produce_different_digests() {
        let a = hash_patient_identifier("P123", b"pepper-a");
        let b = hash_patient_identifier("P123", b"pepper-b");
        assert_ne!(a, b);
    }

    #[test]
    fn maybe_hash_passes_through_when_disabled() {
        assert_eq!(maybe_hash("P123".to_string(), false, b"pepper"), "P123");
    }

    #[test]
    fn maybe_hash_hashes_when_enabled() {
        let hashed = maybe_hash("P123".to_string(), true, b"pepper");
        assert_ne!(hashed, "P123");
        assert_eq!(hashed.len(), 64);
    }
}
