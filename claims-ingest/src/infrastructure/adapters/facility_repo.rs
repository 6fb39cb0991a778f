// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `claims.facility_config`: per-facility SOAP endpoint and encrypted
//! credential storage, read by the SOAP fetch coordinator and the ack
//! adapter, written back by C1's credential rotation.

use async_trait::async_trait;

use claims_ingest_domain::entities::{CiphertextEnvelope, FacilityConfig};
use claims_ingest_domain::services::FacilityConfigRepository;
use claims_ingest_domain::value_objects::{FacilityCode, FacilityConfigId};
use claims_ingest_domain::IngestionError;

use crate::infrastructure::db::PgPool;

pub struct SqlxFacilityConfigRepository {
    pool: PgPool,
}

impl SqlxFacilityConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> IngestionError {
    IngestionError::persistence(e.to_string())
}

type FacilityRow = (String, String, String, String, Vec<u8>, Vec<u8>, i32, String, String, String, i16, bool);

fn row_to_config(row: FacilityRow) -> Result<FacilityConfig, IngestionError> {
    let (id, facility_code, display_name, endpoint_url, login_ciphertext, password_ciphertext, kek_version, algorithm, login_iv_base64, password_iv_base64, tag_bits, active) =
        row;
    let id: FacilityConfigId = id.parse()?;
    Ok(FacilityConfig {
        id,
        facility_code: FacilityCode::new(facility_code)?,
        display_name,
        endpoint_url,
        login_ciphertext,
        login_envelope: CiphertextEnvelope {
            kek_version: kek_version as u32,
            algorithm: algorithm.clone(),
            iv_base64: login_iv_base64,
            tag_bits: tag_bits as u16,
        },
        password_ciphertext,
        password_envelope: CiphertextEnvelope { kek_version: kek_version as u32, algorithm, iv_base64: password_iv_base64, tag_bits: tag_bits as u16 },
        active,
    })
}

#[async_trait]
impl FacilityConfigRepository for SqlxFacilityConfigRepository {
    async fn active_facilities(&self) -> Result<Vec<FacilityConfig>, IngestionError> {
        let rows: Vec<FacilityRow> = sqlx::query_as(
            "select id, facility_code, display_name, endpoint_url, login_ciphertext, password_ciphertext, \
             kek_version, algorithm, login_iv_base64, password_iv_base64, tag_bits, active \
             from claims.facility_config where active = true order by facility_code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(row_to_config).collect()
    }

    async fn by_code(&self, facility_code: &FacilityCode) -> Result<Option<FacilityConfig>, IngestionError> {
        let row: Option<FacilityRow> = sqlx::query_as(
            "select id, facility_code, display_name, endpoint_url, login_ciphertext, password_ciphertext, \
             kek_version, algorithm, login_iv_base64, password_iv_base64, tag_bits, active \
             from claims.facility_config where facility_code = $1",
        )
        .bind(facility_code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(row_to_config).transpose()
    }

    /// One statement per facility keeps the rewrap atomic per row: a
    /// concurrent decrypt sees either the old pair or the new pair,
    /// never a torn mix.
    async fn update_ciphertext(
        &self,
        facility_code: &FacilityCode,
        login_ciphertext: Vec<u8>,
        login_envelope: CiphertextEnvelope,
        password_ciphertext: Vec<u8>,
        password_envelope: CiphertextEnvelope,
    ) -> Result<(), IngestionError> {
        sqlx::query(
            "update claims.facility_config set login_ciphertext = $2, password_ciphertext = $3, \
             kek_version = $4, algorithm = $5, login_iv_base64 = $6, password_iv_base64 = $7, tag_bits = $8 \
             where facility_code = $1",
        )
        .bind(facility_code.as_str())
        .bind(&login_ciphertext)
        .bind(&password_ciphertext)
        .bind(login_envelope.kek_version as i32)
        .bind(&login_envelope.algorithm)
        .bind(&login_envelope.iv_base64)
        .bind(&password_envelope.iv_base64)
        .bind(login_envelope.tag_bits as i16)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_to_config_rejects_blank_facility_code() {
        let row: FacilityRow = (
            claims_ingest_domain::value_objects::FacilityConfigId::new().to_string(),
            "   ".to_string(),
            "Test Facility".to_string(),
            "https://example.test/soap".to_string(),
            vec![1, 2, 3],
            vec![4, 5, 6],
            1,
            "AES/GCM".to_string(),
            "aXYx".to_string(),
            "aXYy".to_string(),
            128,
            true,
        );
        assert!(row_to_config(row).is_err());
    }

    #[test]
    fn row_to_config_builds_distinct_envelopes_per_ciphertext() {
        let row: FacilityRow = (
            claims_ingest_domain::value_objects::FacilityConfigId::new().to_string(),
            "FAC1".to_string(),
            "Test Facility".to_string(),
            "https://example.test/soap".to_string(),
            vec![1, 2, 3],
            vec![4, 5, 6],
            2,
            "AES/GCM".to_string(),
            "aXYx".to_string(),
            "aXYy".to_string(),
            128,
            true,
        );
        let config = row_to_config(row).unwrap();
        assert_eq!(config.login_envelope.kek_version, 2);
        assert_eq!(config.password_envelope.kek_version, 2);
        assert_ne!(config.login_envelope.iv_base64, config.password_envelope.iv_base64);
    }
}
