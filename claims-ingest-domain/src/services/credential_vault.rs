// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;

use crate::entities::FacilityConfig;
use crate::error::IngestionError;
use crate::value_objects::FacilityCode;

/// Plaintext SOAP credentials for one facility. Zeroized by the adapter
/// that owns the buffer; the domain only carries the shape.
#[derive(Debug, Clone)]
pub struct FacilityCredentials {
    pub login: String,
    pub password: String,
}

/// Port for C1. The adapter decrypts per-facility ciphertext under a
/// rotatable key and caches plaintext briefly (TTL ≤ 5 min).
#[async_trait]
pub trait CredentialVault: Send + Sync {
    async fn decrypt(&self, facility_code: &FacilityCode) -> Result<FacilityCredentials, IngestionError>;

    /// Re-wraps ciphertexts whose `kek_version` is stale under the
    /// current key version. Returns the number of facilities re-wrapped.
    async fn reencrypt_all_if_needed(&self) -> Result<u64, IngestionError>;
}

/// Read-only access to administrator-owned `FacilityConfig` rows. Owned
/// outside the engine (spec's external collaborator boundary); the
/// engine only reads.
#[async_trait]
pub trait FacilityConfigRepository: Send + Sync {
    async fn active_facilities(&self) -> Result<Vec<FacilityConfig>, IngestionError>;
    async fn by_code(&self, facility_code: &FacilityCode) -> Result<Option<FacilityConfig>, IngestionError>;
    async fn update_ciphertext(
        &self,
        facility_code: &FacilityCode,
        login_ciphertext: Vec<u8>,
        login_envelope: crate::entities::CiphertextEnvelope,
        password_ciphertext: Vec<u8>,
        password_envelope: crate::entities::CiphertextEnvelope,
    ) -> Result<(), IngestionError>;
}
