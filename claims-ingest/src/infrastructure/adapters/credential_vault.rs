// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C1: the credential vault. Decrypts `FacilityConfig` ciphertext on
//! demand and caches plaintext briefly so a burst of fetches against
//! the same facility does not re-run PBKDF2 on every call.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use zeroize::Zeroize;

use claims_ingest_domain::services::{CredentialVault, FacilityConfigRepository, FacilityCredentials};
use claims_ingest_domain::value_objects::FacilityCode;
use claims_ingest_domain::IngestionError;

use super::encryption::{self, WrapKeyRing};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

struct CachedCredentials {
    credentials: FacilityCredentials,
    expires_at: Instant,
}

pub struct AesGcmCredentialVault<R> {
    repository: R,
    keys: WrapKeyRing,
    cache: Mutex<HashMap<FacilityCode, CachedCredentials>>,
    ttl: Duration,
}

impl<R> AesGcmCredentialVault<R>
where
    R: FacilityConfigRepository,
{
    pub fn new(repository: R, keys: WrapKeyRing) -> Self {
        Self::with_ttl(repository, keys, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(repository: R, keys: WrapKeyRing, ttl: Duration) -> Self {
        Self { repository, keys, cache: Mutex::new(HashMap::new()), ttl }
    }
}

#[async_trait]
impl<R> CredentialVault for AesGcmCredentialVault<R>
where
    R: FacilityConfigRepository,
{
    async fn decrypt(&self, facility_code: &FacilityCode) -> Result<FacilityCredentials, IngestionError> {
        if let Some(cached) = self.cache.lock().get(facility_code) {
            if cached.expires_at > Instant::now() {
                return Ok(cached.credentials.clone());
            }
        }

        let config = self
            .repository
            .by_code(facility_code)
            .await?
            .ok_or_else(|| IngestionError::credential(format!("no facility config for {facility_code}")))?;

        let login = encryption::decrypt(&self.keys, &config.login_ciphertext, &config.login_envelope)?;
        let password = encryption::decrypt(&self.keys, &config.password_ciphertext, &config.password_envelope)?;

        let credentials = FacilityCredentials {
            login: String::from_utf8(login).map_err(|e| IngestionError::credential(format!("login not utf-8: {e}")))?,
            password: String::from_utf8(password).map_err(|e| IngestionError::credential(format!("password not utf-8: {e}")))?,
        };

        self.cache.lock().insert(
            facility_code.clone(),
            CachedCredentials { credentials: credentials.clone(), expires_at: Instant::now() + self.ttl },
        );

        Ok(credentials)
    }

    async fn reencrypt_all_if_needed(&self) -> Result<u64, IngestionError> {
        let current_version = self.keys.current_version();
        let facilities = self.repository.active_facilities().await?;
        let mut rewrapped = 0u64;

        for facility in facilities {
            if facility.login_envelope.kek_version == current_version && facility.password_envelope.kek_version == current_version {
                continue;
            }
            let mut login = encryption::decrypt(&self.keys, &facility.login_ciphertext, &facility.login_envelope)?;
            let mut password = encryption::decrypt(&self.keys, &facility.password_ciphertext, &facility.password_envelope)?;

            let (login_ciphertext, login_envelope) = encryption::encrypt(&self.keys, &login)?;
            let (password_ciphertext, password_envelope) = encryption::encrypt(&self.keys, &password)?;

            login.zeroize();
            password.zeroize();

            self.repository
                .update_ciphertext(&facility.facility_code, login_ciphertext, login_envelope, password_ciphertext, password_envelope)
                .await?;
            rewrapped += 1;
        }

        self.cache.lock().clear();
        Ok(rewrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::encryption::KEY_LEN;
    use super::*;
    use claims_ingest_domain::entities::{CiphertextEnvelope, FacilityConfig};
    use claims_ingest_domain::value_objects::FacilityConfigId;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeRepository {
        configs: Mutex<HashMap<FacilityCode, FacilityConfig>>,
        update_calls: AtomicU32,
    }

    #[async_trait]
    impl FacilityConfigRepository for FakeRepository {
        async fn active_facilities(&self) -> Result<Vec<FacilityConfig>, IngestionError> {
            Ok(self.configs.lock().values().cloned().collect())
        }

        async fn by_code(&self, facility_code: &FacilityCode) -> Result<Option<FacilityConfig>, IngestionError> {
            Ok(self.configs.lock().get(facility_code).cloned())
        }

        async fn update_ciphertext(
            &self,
            facility_code: &FacilityCode,
            login_ciphertext: Vec<u8>,
            login_envelope: CiphertextEnvelope,
            password_ciphertext: Vec<u8>,
            password_envelope: CiphertextEnvelope,
        ) -> Result<(), IngestionError> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            let mut guard = self.configs.lock();
            if let Some(config) = guard.get_mut(facility_code) {
                config.login_ciphertext = login_ciphertext;
                config.login_envelope = login_envelope;
                config.password_ciphertext = password_ciphertext;
                config.password_envelope = password_envelope;
            }
            Ok(())
        }
    }

    fn seed(facility_code: FacilityCode, keys: &WrapKeyRing, version: u32) -> FacilityConfig {
        let (login_ciphertext, mut login_envelope) = encryption::encrypt(keys, b"user1").unwrap();
        let (password_ciphertext, mut password_envelope) = encryption::encrypt(keys, b"pw1").unwrap();
        login_envelope.kek_version = version;
        password_envelope.kek_version = version;
        FacilityConfig {
            id: FacilityConfigId::new(),
            facility_code,
            display_name: "Test Facility".to_string(),
            endpoint_url: "https://example.test/soap".to_string(),
            login_ciphertext,
            login_envelope,
            password_ciphertext,
            password_envelope,
            active: true,
        }
    }

    #[tokio::test]
    async fn decrypts_facility_credentials() {
        let keys = WrapKeyRing::single(1, [3u8; KEY_LEN]);
        let code = FacilityCode::new("FAC1").unwrap();
        let mut configs = HashMap::new();
        configs.insert(code.clone(), seed(code.clone(), &keys, 1));
        let repository = FakeRepository { configs: Mutex::new(configs), update_calls: AtomicU32::new(0) };
        let vault = AesGcmCredentialVault::new(repository, keys);

        let credentials = vault.decrypt(&code).await.unwrap();
        assert_eq!(credentials.login, "user1");
        assert_eq!(credentials.password, "pw1");
    }

    #[tokio::test]
    async fn unknown_facility_is_a_credential_error() {
        let keys = WrapKeyRing::single(1, [3u8; KEY_LEN]);
        let repository = FakeRepository { configs: Mutex::new(HashMap::new()), update_calls: AtomicU32::new(0) };
        let vault = AesGcmCredentialVault::new(repository, keys);

        let err = vault.decrypt(&FacilityCode::new("MISSING").unwrap()).await.unwrap_err();
        assert!(matches!(err, IngestionError::Credential(_)));
    }

    #[tokio::test]
    async fn reencrypt_skips_facilities_already_on_current_version() {
        let keys = WrapKeyRing::single(1, [3u8; KEY_LEN]);
        let code = FacilityCode::new("FAC1").unwrap();
        let mut configs = HashMap::new();
        configs.insert(code.clone(), seed(code, &keys, 1));
        let repository = FakeRepository { configs: Mutex::new(configs), update_calls: AtomicU32::new(0) };
        let vault = AesGcmCredentialVault::new(repository, keys);

        let rewrapped = vault.reencrypt_all_if_needed().await.unwrap();
        assert_eq!(rewrapped, 0);
        assert_eq!(vault.repository.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reencrypt_rewraps_stale_facilities() {
        let old_keys = WrapKeyRing::single(1, [3u8; KEY_LEN]);
        let code = FacilityCode::new("FAC1").unwrap();
        let mut configs = HashMap::new();
        configs.insert(code.clone(), seed(code, &old_keys, 1));
        let repository = FakeRepository { configs: Mutex::new(configs), update_calls: AtomicU32::new(0) };

        let mut bumped = WrapKeyRing::single(2, [9u8; KEY_LEN]);
        bumped.add_key(1, [3u8; KEY_LEN]);
        let vault = AesGcmCredentialVault::new(repository, bumped);

        let rewrapped = vault.reencrypt_all_if_needed().await.unwrap();
        assert_eq!(rewrapped, 1);
    }
}
