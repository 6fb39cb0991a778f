// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Composition root. Parses the CLI, loads config, wires every adapter
//! behind the domain's service ports, and runs the orchestrator until a
//! signal requests a graceful stop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use claims_ingest_domain::services::{
    Acker, CancellationSignal, CredentialVault, Fetcher, FacilityConfigRepository, Parser, PersistService, SoapGateway, SoapVersion, Verifier,
    WorkQueue,
};
use claims_ingest_domain::IngestionError;

use claims_ingest::application::process_file::{PipelineConfig, ProcessFilePipeline};
use claims_ingest::infrastructure::adapters::{
    encryption, AesGcmCredentialVault, DhpoSoapGateway, LocalFsFetcher, NoopAcker, SoapAcker, SoapCoordinatorConfig, SoapFetchCoordinator,
    SqlxAuditSink, SqlxFacilityConfigRepository, SqlxPersistService, SqlxVerifier,
};
use claims_ingest::infrastructure::config::AppConfig;
use claims_ingest::infrastructure::metrics::{MetricsEndpoint, MetricsService};
use claims_ingest::infrastructure::parsing::XmlStreamingParser;
use claims_ingest::infrastructure::runtime::{BoundedWorkQueue, Orchestrator, OrchestratorConfig};
use claims_ingest::infrastructure::{db, logging};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match claims_ingest_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("argument error: {e}");
            return claims_ingest_bootstrap::ExitCode::Usage.into();
        }
    };

    let config_path = claims_ingest_bootstrap::config::resolve_config_path(cli.config.as_deref());
    let config_path_str = config_path.as_deref().and_then(|p| p.to_str());
    let config = match claims_ingest::infrastructure::config::load(config_path_str) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e}");
            return claims_ingest_bootstrap::map_error_to_exit_code(&e).into();
        }
    };

    let log_level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    logging::init(log_level, false);

    let result = run(cli.command, config).await;
    claims_ingest_bootstrap::result_to_exit_code(result)
}

async fn run(command: claims_ingest_bootstrap::ValidatedCommand, config: AppConfig) -> Result<(), IngestionError> {
    log_platform_diagnostics();

    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;

    if command == claims_ingest_bootstrap::ValidatedCommand::Migrate {
        tracing::info!("migrations applied, exiting");
        return Ok(());
    }

    let shutdown = claims_ingest_bootstrap::shutdown::ShutdownCoordinator::default();
    claims_ingest_bootstrap::signals::install(shutdown.clone());
    let cancel: Arc<dyn CancellationSignal> = Arc::new(shutdown.token());

    let keystore_path = PathBuf::from(&config.claims.ame.keystore_path);
    let keys = encryption::load_wrap_key_ring(&config.claims.ame.store_pass, &keystore_path)?;

    let credential_vault: Arc<dyn CredentialVault> =
        Arc::new(AesGcmCredentialVault::new(SqlxFacilityConfigRepository::new(pool.clone()), keys));
    let facilities: Arc<dyn FacilityConfigRepository> = Arc::new(SqlxFacilityConfigRepository::new(pool.clone()));

    match credential_vault.reencrypt_all_if_needed().await {
        Ok(0) => {}
        Ok(rewrapped) => tracing::info!(rewrapped, "re-wrapped facility credentials under the current key version"),
        Err(e) => tracing::warn!(error = %e, "credential re-wrap pass failed; stale ciphertexts remain usable under their recorded key version"),
    }

    let http_client = reqwest::Client::new();
    let soap_version = if config.ingestion.soap.soap12 { SoapVersion::V1_2 } else { SoapVersion::V1_1 };
    let gateway_for: Arc<dyn Fn(&str) -> Arc<dyn SoapGateway> + Send + Sync> = {
        let client = http_client.clone();
        let max_attempts = u32::from(config.dhpo.retries_on_minus4) + 1;
        Arc::new(move |endpoint: &str| -> Arc<dyn SoapGateway> {
            Arc::new(DhpoSoapGateway::new(client.clone(), endpoint, soap_version).with_retry_budget(max_attempts, Duration::from_millis(500)))
        })
    };

    let queue = BoundedWorkQueue::new(config.ingestion.queue.capacity);

    let (fetcher, acker): (Arc<dyn Fetcher>, Arc<dyn Acker>) = if let Some(root) = &config.local_fs_root {
        (Arc::new(LocalFsFetcher::new(root, config.poll_interval())), Arc::new(NoopAcker))
    } else {
        let soap_config = SoapCoordinatorConfig {
            base_tick: config.poll_interval(),
            jitter: Duration::from_millis(config.dhpo.jitter_ms),
            search_days_back: config.dhpo.search_days_back,
            use_get_new_transactions: config.dhpo.use_get_new_transactions,
            stage_to_disk_threshold_bytes: config.dhpo.stage_to_disk_threshold_mb * 1024 * 1024,
            staging_dir: PathBuf::from(&config.dhpo.staging_dir),
        };
        let coordinator = Arc::new(SoapFetchCoordinator::new(credential_vault.clone(), facilities.clone(), gateway_for.clone(), soap_config));

        let lookup_coordinator = coordinator.clone();
        let facility_for_file: Arc<dyn Fn(&str) -> Option<claims_ingest_domain::value_objects::FacilityCode> + Send + Sync> =
            Arc::new(move |file_id: &str| lookup_coordinator.facility_for_file(file_id));

        let acker: Arc<dyn Acker> = Arc::new(SoapAcker::new(credential_vault.clone(), facilities.clone(), gateway_for.clone(), facility_for_file));
        (coordinator, acker)
    };

    let parser: Arc<dyn Parser> = Arc::new(XmlStreamingParser::new());
    let persist: Arc<dyn PersistService> = Arc::new(SqlxPersistService::new(
        pool.clone(),
        config.ingestion.batch.size,
        config.ingestion.tx.granularity,
        config.ingestion.security.pepper.as_bytes().to_vec(),
    ));
    let verifier: Arc<dyn Verifier> = Arc::new(SqlxVerifier::new(pool.clone()));
    let audit = Arc::new(SqlxAuditSink::new(pool.clone()));
    let metrics = Arc::new(MetricsService::new()?);

    let pipeline = Arc::new(ProcessFilePipeline::new(
        parser,
        persist,
        verifier,
        acker,
        audit.clone(),
        metrics.clone(),
        PipelineConfig {
            fail_on_xsd_error: config.ingestion.parse.fail_on_xsd_error,
            max_attachment_bytes: config.ingestion.parse.max_attachment_bytes,
            hash_sensitive: config.ingestion.security.hash_sensitive,
            ack_enabled: config.ingestion.ack.enabled,
        },
    ));

    let orchestrator_config = OrchestratorConfig {
        tick_period: config.poll_interval(),
        drain_batch_size: config.ingestion.batch.size,
        worker_count: config.ingestion.concurrency.parser_workers,
        ..OrchestratorConfig::default()
    };
    let orchestrator = Orchestrator::new(queue.clone(), orchestrator_config, audit, move |item, run_id| {
        let pipeline = pipeline.clone();
        async move { pipeline.process(item, run_id).await }
    });

    let metrics_endpoint = Arc::new(MetricsEndpoint::new(metrics.clone(), config.metrics_bind_addr.clone()));

    metrics.set_queue_capacity(config.ingestion.queue.capacity);
    let gauge_metrics = metrics.clone();
    let gauge_queue = queue.clone();
    let gauge_cancel = cancel.clone();
    let gauge_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = gauge_cancel.cancelled() => break,
                _ = interval.tick() => gauge_metrics.set_queue_depth(gauge_queue.depth()),
            }
        }
    });

    let fetcher_cancel = cancel.clone();
    let fetcher_queue = queue.clone();
    let fetcher_task = tokio::spawn(async move { fetcher.run(&*fetcher_queue, &*fetcher_cancel).await });

    let metrics_task = tokio::spawn(async move {
        if let Err(e) = metrics_endpoint.start().await {
            tracing::error!(error = %e, "metrics endpoint stopped");
        }
    });

    orchestrator.run(cancel).await;
    shutdown.complete_shutdown();

    metrics_task.abort();
    let _ = gauge_task.await;
    match fetcher_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "fetcher exited with an error"),
        Err(e) => tracing::warn!(error = %e, "fetcher task panicked"),
    }

    Ok(())
}

/// Logs the host's resource envelope once at startup, and flags running
/// as root — this engine needs no elevated privilege and an operator
/// running it that way is almost always a misconfigured deploy.
fn log_platform_diagnostics() {
    let platform = claims_ingest_bootstrap::platform::create_platform();
    tracing::info!(
        platform = platform.platform_name(),
        cpu_count = platform.cpu_count(),
        page_size = platform.page_size(),
        total_memory = ?platform.total_memory(),
        available_memory = ?platform.available_memory(),
        "host resource envelope"
    );
    if platform.is_elevated() {
        tracing::warn!("running with elevated privileges; this engine does not require root");
    }
}
