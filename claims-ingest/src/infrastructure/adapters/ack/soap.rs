// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C10 (SOAP profile): calls `SetTransactionDownloaded` against the
//! facility that produced the file, per the fetch coordinator's
//! `fileId -> facilityCode` registry. Best-effort: any failure here is
//! logged and reported as `false`, never retried against already
//! -committed data.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use claims_ingest_domain::services::{CredentialVault, FacilityConfigRepository, SoapGateway};
use claims_ingest_domain::services::Acker;
use claims_ingest_domain::value_objects::FacilityCode;

pub struct SoapAcker {
    credential_vault: Arc<dyn CredentialVault>,
    facilities: Arc<dyn FacilityConfigRepository>,
    gateway_for: Arc<dyn Fn(&str) -> Arc<dyn SoapGateway> + Send + Sync>,
    facility_for_file: Arc<dyn Fn(&str) -> Option<FacilityCode> + Send + Sync>,
}

impl SoapAcker {
    pub fn new(
        credential_vault: Arc<dyn CredentialVault>,
        facilities: Arc<dyn FacilityConfigRepository>,
        gateway_for: Arc<dyn Fn(&str) -> Arc<dyn SoapGateway> + Send + Sync>,
        facility_for_file: Arc<dyn Fn(&str) -> Option<FacilityCode> + Send + Sync>,
    ) -> Self {
        Self { credential_vault, facilities, gateway_for, facility_for_file }
    }

    async fn try_ack(&self, file_id: &str) -> Option<bool> {
        let facility_code = (self.facility_for_file)(file_id)?;
        let facility = self.facilities.by_code(&facility_code).await.ok()??;
        let credentials = self.credential_vault.decrypt(&facility_code).await.ok()?;
        let gateway = (self.gateway_for)(&facility.endpoint_url);

        let (code, error_message) = gateway.set_transaction_downloaded(&credentials.login, &credentials.password, file_id).await.ok()?;
        if !code.is_ok() {
            warn!(file_id, facility = %facility_code, code = code.0, error = ?error_message, "SetTransactionDownloaded rejected");
            return Some(false);
        }
        Some(true)
    }
}

#[async_trait]
impl Acker for SoapAcker {
    async fn ack(&self, file_id: &str) -> bool {
        match self.try_ack(file_id).await {
            Some(result) => result,
            None => {
                warn!(file_id, "ack failed: facility unresolved or transport error");
                false
            }
        }
    }
}
