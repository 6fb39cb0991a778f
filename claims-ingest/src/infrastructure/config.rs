// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Layered application configuration: embedded defaults, an optional
//! TOML file, then `INGEST_`-prefixed environment overrides. Loaded and
//! validated once at startup; every adapter takes its slice of
//! [`AppConfig`] by value rather than re-reading the environment.

use std::time::Duration;

use claims_ingest_domain::IngestionError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: 500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub parser_workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            parser_workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { size: 200 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TxGranularity {
    PerFile,
    PerChunk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TxConfig {
    pub granularity: TxGranularity,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self { granularity: TxGranularity::PerFile }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub hash_sensitive: bool,
    /// Deployment secret mixed into `patient_identifier` hashing when
    /// `hash_sensitive` is set. Empty by default so a misconfigured
    /// deployment produces an obviously-weak hash rather than failing
    /// to start.
    pub pepper: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { hash_sensitive: false, pepper: String::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AckConfig {
    pub enabled: bool,
}

impl Default for AckConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapConfig {
    pub transport: String,
    pub soap12: bool,
}

impl Default for SoapConfig {
    fn default() -> Self {
        Self { transport: "http".to_string(), soap12: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Reject a file at the first XSD validation problem instead of
    /// collecting every problem and persisting what parsed.
    pub fail_on_xsd_error: bool,
    pub max_attachment_bytes: u64,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self { fail_on_xsd_error: false, max_attachment_bytes: 10 * 1024 * 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSection {
    pub poll: PollConfig,
    pub concurrency: ConcurrencyConfig,
    pub queue: QueueConfig,
    pub batch: BatchConfig,
    pub tx: TxConfig,
    pub security: SecurityConfig,
    pub ack: AckConfig,
    pub soap: SoapConfig,
    pub parse: ParseConfig,
}

impl Default for IngestionSection {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            queue: QueueConfig::default(),
            batch: BatchConfig::default(),
            tx: TxConfig::default(),
            security: SecurityConfig::default(),
            ack: AckConfig::default(),
            soap: SoapConfig::default(),
            parse: ParseConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DhpoClientConfig {
    pub search_days_back: u32,
    pub retries_on_minus4: u8,
    pub stage_to_disk_threshold_mb: u64,
    pub jitter_ms: u64,
    pub use_get_new_transactions: bool,
    pub staging_dir: String,
}

impl Default for DhpoClientConfig {
    fn default() -> Self {
        Self {
            search_days_back: 7,
            retries_on_minus4: 3,
            stage_to_disk_threshold_mb: 8,
            jitter_ms: 2_000,
            use_get_new_transactions: true,
            staging_dir: "/var/lib/claims-ingest/staging".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmeConfig {
    pub store_pass: String,
    pub keystore_path: String,
}

impl Default for AmeConfig {
    fn default() -> Self {
        Self { store_pass: String::new(), keystore_path: "keystore.bin".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefdataConfig {
    pub auto_insert: bool,
}

impl Default for RefdataConfig {
    fn default() -> Self {
        Self { auto_insert: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsSection {
    pub ame: AmeConfig,
    pub refdata: RefdataConfig,
}

impl Default for ClaimsSection {
    fn default() -> Self {
        Self { ame: AmeConfig::default(), refdata: RefdataConfig::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost:5432/claims".to_string(),
            pool_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ingestion: IngestionSection,
    pub dhpo: DhpoClientConfig,
    pub claims: ClaimsSection,
    pub local_fs_root: Option<String>,
    pub metrics_bind_addr: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            ingestion: IngestionSection::default(),
            dhpo: DhpoClientConfig::default(),
            claims: ClaimsSection::default(),
            local_fs_root: None,
            metrics_bind_addr: "0.0.0.0:9898".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.ingestion.poll.interval_ms)
    }

    /// Invariants a malformed file or environment override cannot be
    /// allowed to violate silently.
    pub fn validate(&self) -> Result<(), IngestionError> {
        if self.ingestion.queue.capacity == 0 {
            return Err(IngestionError::invalid_configuration("ingestion.queue.capacity must be > 0"));
        }
        if self.ingestion.concurrency.parser_workers == 0 {
            return Err(IngestionError::invalid_configuration("ingestion.concurrency.parserWorkers must be > 0"));
        }
        if self.dhpo.retries_on_minus4 > 5 {
            return Err(IngestionError::invalid_configuration("dhpo.client.retriesOnMinus4 must be between 0 and 5"));
        }
        if self.ingestion.soap.transport != "http" && self.ingestion.soap.transport != "ws" {
            return Err(IngestionError::invalid_configuration("ingestion.soap.transport must be \"http\" or \"ws\""));
        }
        Ok(())
    }
}

/// Loads defaults, layers an optional TOML file, then `INGEST_`-prefixed
/// environment overrides (double underscore as the nesting separator,
/// e.g. `INGEST_INGESTION__QUEUE__CAPACITY=2048`).
pub fn load(config_path: Option<&str>) -> Result<AppConfig, IngestionError> {
    let mut builder = config::Config::builder().add_source(config::Config::try_from(&AppConfig::default()).map_err(config_err)?);

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }

    builder = builder.add_source(config::Environment::with_prefix("INGEST").separator("__").try_parsing(true));

    let settings = builder.build().map_err(config_err)?;
    let app_config: AppConfig = settings.try_deserialize().map_err(config_err)?;
    app_config.validate()?;
    Ok(app_config)
}

fn config_err(e: config::ConfigError) -> IngestionError {
    IngestionError::invalid_configuration(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_queue_capacity_rejected() {
        let mut config = AppConfig::default();
        config.ingestion.queue.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_budget_above_five_rejected() {
        let mut config = AppConfig::default();
        config.dhpo.retries_on_minus4 = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_transport_rejected() {
        let mut config = AppConfig::default();
        config.ingestion.soap.transport = "grpc".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_with_no_file_returns_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config.ingestion.queue.capacity, 1024);
    }
}
