// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! AES-256-GCM envelope encryption for the credential vault (C1). The
//! wrap key is loaded once at startup from a keystore file; every
//! ciphertext carries its own IV and is self-describing via
//! [`claims_ingest_domain::entities::CiphertextEnvelope`].

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::Engine;
use claims_ingest_domain::entities::CiphertextEnvelope;
use claims_ingest_domain::IngestionError;
use rand::RngCore;

pub const NONCE_LEN: usize = 12;
const SALT_LEN: usize = 16;
const PBKDF2_ITERATIONS: u32 = 600_000;
const CURRENT_KEK_VERSION: u32 = 1;
pub const KEY_LEN: usize = 32;
pub const TAG_BITS: u16 = 128;

/// A loaded wrap key, keyed by version. Rotation appends a new version
/// without discarding old ones, so previously wrapped ciphertexts keep
/// decrypting until `reencrypt_all_if_needed` catches up.
#[derive(Clone)]
pub struct WrapKeyRing {
    current_version: u32,
    keys: Vec<(u32, [u8; KEY_LEN])>,
}

impl WrapKeyRing {
    pub fn single(version: u32, key: [u8; KEY_LEN]) -> Self {
        Self {
            current_version: version,
            keys: vec![(version, key)],
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn key_for_version(&self, version: u32) -> Option<&[u8; KEY_LEN]> {
        self.keys.iter().find(|(v, _)| *v == version).map(|(_, k)| k)
    }

    pub fn current_key(&self) -> &[u8; KEY_LEN] {
        self.key_for_version(self.current_version).expect("current key version must be loaded")
    }

    /// Appends an older key version so ciphertexts wrapped under it keep
    /// decrypting during a rotation window.
    pub fn add_key(&mut self, version: u32, key: [u8; KEY_LEN]) {
        self.keys.push((version, key));
    }
}

pub fn encrypt(ring: &WrapKeyRing, plaintext: &[u8]) -> Result<(Vec<u8>, CiphertextEnvelope), IngestionError> {
    let key = Key::<Aes256Gcm>::from_slice(ring.current_key());
    let cipher = Aes256Gcm::new(key);

    let mut iv = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
        .map_err(|e| IngestionError::credential(format!("encryption failed: {e}")))?;

    let envelope = CiphertextEnvelope {
        kek_version: ring.current_version(),
        algorithm: "AES/GCM".to_string(),
        iv_base64: base64::engine::general_purpose::STANDARD.encode(iv),
        tag_bits: TAG_BITS,
    };
    Ok((ciphertext, envelope))
}

/// Tag mismatch (corrupt ciphertext, wrong key version) surfaces as
/// `IngestionError::Credential` and is fatal for the facility — callers
/// must not retry without operator intervention.
pub fn decrypt(ring: &WrapKeyRing, ciphertext: &[u8], envelope: &CiphertextEnvelope) -> Result<Vec<u8>, IngestionError> {
    let key_bytes = ring
        .key_for_version(envelope.kek_version)
        .ok_or_else(|| IngestionError::credential(format!("no wrap key for kek_version {}", envelope.kek_version)))?;
    let key = Key::<Aes256Gcm>::from_slice(key_bytes);
    let cipher = Aes256Gcm::new(key);

    let iv = base64::engine::general_purpose::STANDARD
        .decode(&envelope.iv_base64)
        .map_err(|e| IngestionError::credential(format!("corrupt iv: {e}")))?;
    if iv.len() != NONCE_LEN {
        return Err(IngestionError::credential("corrupt iv length"));
    }
    let nonce = Nonce::from_slice(&iv);

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad: &[] })
        .map_err(|_| IngestionError::credential("authentication failed: ciphertext corrupt or tag mismatch"))
}

/// Loads `store_pass`'s PBKDF2-HMAC-SHA256 derived key from the
/// salt on disk at `keystore_path`, creating a fresh random salt on
/// first run. The passphrase itself never touches disk.
pub fn load_wrap_key_ring(store_pass: &str, keystore_path: &std::path::Path) -> Result<WrapKeyRing, IngestionError> {
    let salt = match std::fs::read(keystore_path) {
        Ok(bytes) if bytes.len() >= SALT_LEN => bytes[..SALT_LEN].to_vec(),
        Ok(_) => return Err(IngestionError::credential(format!("keystore at {} is shorter than {SALT_LEN} bytes", keystore_path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let mut salt = vec![0u8; SALT_LEN];
            rand::rng().fill_bytes(&mut salt);
            if let Some(parent) = keystore_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(keystore_path, &salt)?;
            salt
        }
        Err(e) => return Err(e.into()),
    };

    let mut key = [0u8; KEY_LEN];
    let iterations = std::num::NonZeroU32::new(PBKDF2_ITERATIONS).expect("PBKDF2_ITERATIONS is nonzero");
    ring::pbkdf2::derive(ring::pbkdf2::PBKDF2_HMAC_SHA256, iterations, &salt, store_pass.as_bytes(), &mut key);

    Ok(WrapKeyRing::single(CURRENT_KEK_VERSION, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> WrapKeyRing {
        WrapKeyRing::single(1, [7u8; KEY_LEN])
    }

    #[test]
    fn load_wrap_key_ring_creates_and_reuses_salt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.bin");

        let first = load_wrap_key_ring("s3cret", &path).unwrap();
        let second = load_wrap_key_ring("s3cret", &path).unwrap();
        assert_eq!(first.current_key(), second.current_key());
    }

    #[test]
    fn load_wrap_key_ring_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keystore.bin");
        std::fs::write(&path, b"short").unwrap();
        assert!(load_wrap_key_ring("s3cret", &path).is_err());
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let ring = ring();
        let (ciphertext, envelope) = encrypt(&ring, b"super-secret-password").unwrap();
        let plaintext = decrypt(&ring, &ciphertext, &envelope).unwrap();
        assert_eq!(plaintext, b"super-secret-password");
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let ring = ring();
        let (mut ciphertext, envelope) = encrypt(&ring, b"password").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;
        assert!(decrypt(&ring, &ciphertext, &envelope).is_err());
    }

    #[test]
    fn unknown_kek_version_fails_cleanly() {
        let ring = ring();
        let (ciphertext, mut envelope) = encrypt(&ring, b"password").unwrap();
        envelope.kek_version = 99;
        assert!(decrypt(&ring, &ciphertext, &envelope).is_err());
    }

    #[test]
    fn each_encryption_uses_a_fresh_iv() {
        let ring = ring();
        let (_, envelope_a) = encrypt(&ring, b"password").unwrap();
        let (_, envelope_b) = encrypt(&ring, b"password").unwrap();
        assert_ne!(envelope_a.iv_base64, envelope_b.iv_base64);
    }
}
