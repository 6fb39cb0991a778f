// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C3 (SOAP variant): on a fixed, jittered cadence, lists candidate
//! files per active facility, downloads each, and offers it to the
//! queue. A bounded `fileId -> facilityCode` registry lets the acker
//! (C10) look up which facility to `SetTransactionDownloaded` against.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tracing::{error, info, warn};

use claims_ingest_domain::services::{CancellationSignal, CredentialVault, Fetcher, FacilityConfigRepository, SearchFilter, SoapGateway, WorkItem, WorkItemSource, WorkQueue};
use claims_ingest_domain::value_objects::FacilityCode;
use claims_ingest_domain::IngestionError;

use crate::infrastructure::runtime::WatermarkGate;

const OFFER_TIMEOUT: Duration = Duration::from_millis(250);
const REGISTRY_CAPACITY: usize = 10_000;

pub struct SoapCoordinatorConfig {
    pub base_tick: Duration,
    pub jitter: Duration,
    pub search_days_back: u32,
    pub use_get_new_transactions: bool,
    pub stage_to_disk_threshold_bytes: u64,
    pub staging_dir: PathBuf,
}

/// Caps a `VecDeque`-backed FIFO so the registry cannot grow unbounded
/// across a long-running process; entries age out on overflow.
struct BoundedRegistry {
    order: VecDeque<String>,
    by_file_id: HashMap<String, FacilityCode>,
    capacity: usize,
}

impl BoundedRegistry {
    fn new(capacity: usize) -> Self {
        Self { order: VecDeque::new(), by_file_id: HashMap::new(), capacity }
    }

    fn insert(&mut self, file_id: String, facility_code: FacilityCode) {
        if self.by_file_id.insert(file_id.clone(), facility_code).is_none() {
            self.order.push_back(file_id);
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.by_file_id.remove(&oldest);
                }
            }
        }
    }

    fn get(&self, file_id: &str) -> Option<FacilityCode> {
        self.by_file_id.get(file_id).cloned()
    }
}

pub struct SoapFetchCoordinator {
    credential_vault: Arc<dyn CredentialVault>,
    facilities: Arc<dyn FacilityConfigRepository>,
    gateway_for: Arc<dyn Fn(&str) -> Arc<dyn SoapGateway> + Send + Sync>,
    config: SoapCoordinatorConfig,
    registry: Mutex<BoundedRegistry>,
    gate: WatermarkGate,
}

impl SoapFetchCoordinator {
    pub fn new(
        credential_vault: Arc<dyn CredentialVault>,
        facilities: Arc<dyn FacilityConfigRepository>,
        gateway_for: Arc<dyn Fn(&str) -> Arc<dyn SoapGateway> + Send + Sync>,
        config: SoapCoordinatorConfig,
    ) -> Self {
        Self {
            credential_vault,
            facilities,
            gateway_for,
            config,
            registry: Mutex::new(BoundedRegistry::new(REGISTRY_CAPACITY)),
            gate: WatermarkGate::default(),
        }
    }

    pub fn facility_for_file(&self, file_id: &str) -> Option<FacilityCode> {
        self.registry.lock().get(file_id)
    }

    fn next_tick_delay(&self) -> Duration {
        if self.config.jitter.is_zero() {
            return self.config.base_tick;
        }
        let jitter_ms = self.config.jitter.as_millis() as i64;
        let offset = rand::rng().random_range(-jitter_ms..=jitter_ms);
        let base_ms = self.config.base_tick.as_millis() as i64;
        Duration::from_millis((base_ms + offset).max(0) as u64)
    }

    async fn tick(&self, queue: &dyn WorkQueue) {
        if !self.gate.permits(queue) {
            info!("queue past high watermark, skipping fetch tick");
            return;
        }

        let facilities = match self.facilities.active_facilities().await {
            Ok(facilities) => facilities,
            Err(e) => {
                error!(error = ?e, "failed listing active facilities");
                return;
            }
        };

        for facility in facilities {
            if let Err(e) = self.process_facility(queue, &facility.facility_code, &facility.endpoint_url).await {
                warn!(facility = %facility.facility_code, error = ?e, "SOAP fetch failed for facility");
            }
        }
    }

    async fn process_facility(&self, queue: &dyn WorkQueue, facility_code: &FacilityCode, endpoint_url: &str) -> Result<(), IngestionError> {
        let credentials = self.credential_vault.decrypt(facility_code).await?;
        let gateway = (self.gateway_for)(endpoint_url);

        let entries = if self.config.use_get_new_transactions {
            let (code, entries) = gateway.get_new_transactions(&credentials.login, &credentials.password).await?;
            if !code.is_ok() && !code.is_transient() {
                return Err(IngestionError::transport(format!("GetNewTransactions returned code {}", code.0)));
            }
            entries
        } else {
            let date_to = chrono::Utc::now();
            let date_from = date_to - chrono::Duration::days(self.config.search_days_back as i64);
            let filter = SearchFilter {
                direction: None,
                caller_license: None,
                e_partner: None,
                transaction_id: None,
                status: None,
                date_from: Some(date_from),
                date_to: Some(date_to),
                min_record_count: None,
                max_record_count: None,
            };
            let (_, entries) = gateway.search_transactions(&credentials.login, &credentials.password, &filter).await?;
            entries
        };

        for entry in entries {
            if entry.is_downloaded == Some(true) {
                continue;
            }
            self.registry.lock().insert(entry.file_id.clone(), facility_code.clone());

            let (code, downloaded, error_message) = gateway.download_transaction_file(&credentials.login, &credentials.password, &entry.file_id).await?;
            if !code.is_ok() {
                warn!(facility = %facility_code, file_id = %entry.file_id, code = code.0, error = ?error_message, "download failed");
                continue;
            }
            let Some(downloaded) = downloaded else { continue };
            if downloaded.bytes.is_empty() {
                warn!(facility = %facility_code, file_id = %entry.file_id, "download returned empty bytes, skipping");
                continue;
            }

            // Large payloads spill to disk; the item then carries only the
            // staged path and the pipeline reads (and removes) the file.
            let (bytes, source_path) = if downloaded.bytes.len() as u64 >= self.config.stage_to_disk_threshold_bytes {
                let staged = self.stage_to_disk(&entry.file_id, &downloaded.bytes).await?;
                (Vec::new(), Some(staged))
            } else {
                (downloaded.bytes, None)
            };
            let staged_path = source_path.clone();

            let item = WorkItem {
                file_id: entry.file_id.clone(),
                bytes,
                source_path,
                source: WorkItemSource::Soap,
                correlation_id: entry.file_id.clone(),
            };

            if !queue.offer(item, OFFER_TIMEOUT).await {
                info!(facility = %facility_code, "queue saturated, pausing facility downloads for this tick");
                if let Some(path) = staged_path {
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        warn!(path = %path.display(), error = %e, "failed removing staged payload after queue rejection");
                    }
                }
                break;
            }
        }
        Ok(())
    }

    async fn stage_to_disk(&self, file_id: &str, bytes: &[u8]) -> Result<PathBuf, IngestionError> {
        tokio::fs::create_dir_all(&self.config.staging_dir).await?;
        let staged_path = self.config.staging_dir.join(format!("{file_id}.tmp"));
        let final_path = self.config.staging_dir.join(file_id);

        let mut file = tokio::fs::File::create(&staged_path).await?;
        use tokio::io::AsyncWriteExt;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&staged_path, &final_path).await?;

        Ok(final_path)
    }
}

#[async_trait]
impl Fetcher for SoapFetchCoordinator {
    async fn run(&self, queue: &dyn WorkQueue, cancel: &dyn CancellationSignal) -> Result<(), IngestionError> {
        loop {
            let delay = self.next_tick_delay();
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {
                    self.tick(queue).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_evicts_oldest_entry_past_capacity() {
        let mut registry = BoundedRegistry::new(2);
        registry.insert("a".to_string(), FacilityCode::new("F1").unwrap());
        registry.insert("b".to_string(), FacilityCode::new("F1").unwrap());
        registry.insert("c".to_string(), FacilityCode::new("F1").unwrap());
        assert!(registry.get("a").is_none());
        assert!(registry.get("b").is_some());
        assert!(registry.get("c").is_some());
    }

    fn coordinator_with(config: SoapCoordinatorConfig) -> SoapFetchCoordinator {
        SoapFetchCoordinator::new(
            Arc::new(NullCredentialVault),
            Arc::new(NullFacilityRepository),
            Arc::new(|_: &str| -> Arc<dyn SoapGateway> { unimplemented!() }),
            config,
        )
    }

    #[test]
    fn jitter_of_zero_returns_base_tick() {
        let coordinator = coordinator_with(SoapCoordinatorConfig {
            base_tick: Duration::from_secs(1800),
            jitter: Duration::ZERO,
            search_days_back: 7,
            use_get_new_transactions: true,
            stage_to_disk_threshold_bytes: 8 * 1024 * 1024,
            staging_dir: PathBuf::from("/tmp/staging"),
        });
        assert_eq!(coordinator.next_tick_delay(), Duration::from_secs(1800));
    }

    #[tokio::test]
    async fn stage_to_disk_returns_the_staged_path_and_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let coordinator = coordinator_with(SoapCoordinatorConfig {
            base_tick: Duration::from_secs(1800),
            jitter: Duration::ZERO,
            search_days_back: 7,
            use_get_new_transactions: true,
            stage_to_disk_threshold_bytes: 1,
            staging_dir: tmp.path().join("staging"),
        });

        let staged = coordinator.stage_to_disk("F1.xml", b"<Claim.Submission/>").await.unwrap();

        assert_eq!(staged, tmp.path().join("staging/F1.xml"));
        assert_eq!(tokio::fs::read(&staged).await.unwrap(), b"<Claim.Submission/>");
        assert!(!tmp.path().join("staging/F1.xml.tmp").exists());
    }

    struct NullCredentialVault;
    #[async_trait]
    impl CredentialVault for NullCredentialVault {
        async fn decrypt(&self, _: &FacilityCode) -> Result<claims_ingest_domain::services::FacilityCredentials, IngestionError> {
            unimplemented!()
        }
        async fn reencrypt_all_if_needed(&self) -> Result<u64, IngestionError> {
            unimplemented!()
        }
    }

    struct NullFacilityRepository;
    #[async_trait]
    impl FacilityConfigRepository for NullFacilityRepository {
        async fn active_facilities(&self) -> Result<Vec<claims_ingest_domain::entities::FacilityConfig>, IngestionError> {
            unimplemented!()
        }
        async fn by_code(&self, _: &FacilityCode) -> Result<Option<claims_ingest_domain::entities::FacilityConfig>, IngestionError> {
            unimplemented!()
        }
        async fn update_ciphertext(
            &self,
            _: &FacilityCode,
            _: Vec<u8>,
            _: claims_ingest_domain::entities::CiphertextEnvelope,
            _: Vec<u8>,
            _: claims_ingest_domain::entities::CiphertextEnvelope,
        ) -> Result<(), IngestionError> {
            unimplemented!()
        }
    }
}
