// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C11 (metrics half): Prometheus counters, gauges, and histograms for
//! ingestion throughput, queue back-pressure, and error rates.

use std::sync::Arc;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

use claims_ingest_domain::IngestionError;

#[derive(Clone)]
pub struct MetricsService {
    registry: Arc<Registry>,

    files_by_status_total: IntCounterVec,
    claims_inserted_total: IntCounter,
    activities_inserted_total: IntCounter,
    observations_inserted_total: IntCounter,
    conflicts_ignored_total: IntCounter,
    parse_errors_total: IntCounter,
    persist_errors_total: IntCounter,

    queue_depth: IntGauge,
    queue_capacity: IntGauge,

    batch_duration_seconds: Histogram,
}

impl MetricsService {
    pub fn new() -> Result<Self, IngestionError> {
        let registry = Arc::new(Registry::new());

        let files_by_status_total = IntCounterVec::new(
            Opts::new("ingestion_files_by_status_total", "Ingested files grouped by terminal status"),
            &["status"],
        )
        .map_err(metrics_err)?;

        let claims_inserted_total = IntCounter::with_opts(Opts::new("ingestion_claims_inserted_total", "Claim rows inserted")).map_err(metrics_err)?;
        let activities_inserted_total =
            IntCounter::with_opts(Opts::new("ingestion_activities_inserted_total", "Activity rows inserted")).map_err(metrics_err)?;
        let observations_inserted_total =
            IntCounter::with_opts(Opts::new("ingestion_observations_inserted_total", "Observation rows inserted")).map_err(metrics_err)?;
        let conflicts_ignored_total =
            IntCounter::with_opts(Opts::new("ingestion_conflicts_ignored_total", "Duplicate rows skipped via ON CONFLICT DO NOTHING")).map_err(metrics_err)?;
        let parse_errors_total = IntCounter::with_opts(Opts::new("ingestion_parse_errors_total", "Parse problems of severity error")).map_err(metrics_err)?;
        let persist_errors_total = IntCounter::with_opts(Opts::new("ingestion_persist_errors_total", "Persist service failures")).map_err(metrics_err)?;

        let queue_depth = IntGauge::with_opts(Opts::new("ingestion_queue_depth", "Current bounded work queue depth")).map_err(metrics_err)?;
        let queue_capacity = IntGauge::with_opts(Opts::new("ingestion_queue_capacity", "Configured bounded work queue capacity")).map_err(metrics_err)?;

        let batch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("ingestion_batch_duration_seconds", "Wall time spent persisting one file's batch")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )
        .map_err(metrics_err)?;

        registry.register(Box::new(files_by_status_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(claims_inserted_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(activities_inserted_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(observations_inserted_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(conflicts_ignored_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(parse_errors_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(persist_errors_total.clone())).map_err(metrics_err)?;
        registry.register(Box::new(queue_depth.clone())).map_err(metrics_err)?;
        registry.register(Box::new(queue_capacity.clone())).map_err(metrics_err)?;
        registry.register(Box::new(batch_duration_seconds.clone())).map_err(metrics_err)?;

        Ok(Self {
            registry,
            files_by_status_total,
            claims_inserted_total,
            activities_inserted_total,
            observations_inserted_total,
            conflicts_ignored_total,
            parse_errors_total,
            persist_errors_total,
            queue_depth,
            queue_capacity,
            batch_duration_seconds,
        })
    }

    pub fn record_file_status(&self, status: &str) {
        self.files_by_status_total.with_label_values(&[status]).inc();
    }

    pub fn record_persist_counts(&self, claims: u32, activities: u32, observations: u32, conflicts: u32) {
        self.claims_inserted_total.inc_by(claims as u64);
        self.activities_inserted_total.inc_by(activities as u64);
        self.observations_inserted_total.inc_by(observations as u64);
        self.conflicts_ignored_total.inc_by(conflicts as u64);
    }

    pub fn increment_parse_errors(&self) {
        self.parse_errors_total.inc();
    }

    pub fn increment_persist_errors(&self) {
        self.persist_errors_total.inc();
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.set(depth as i64);
    }

    pub fn set_queue_capacity(&self, capacity: usize) {
        self.queue_capacity.set(capacity as i64);
    }

    pub fn record_batch_duration(&self, duration: std::time::Duration) {
        self.batch_duration_seconds.observe(duration.as_secs_f64());
    }

    pub fn render(&self) -> Result<String, IngestionError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).map_err(metrics_err)?;
        String::from_utf8(buffer).map_err(|e| IngestionError::internal(format!("metrics buffer not utf-8: {e}")))
    }
}

fn metrics_err(e: impl std::fmt::Display) -> IngestionError {
    IngestionError::internal(format!("metrics registration failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registers_without_error() {
        assert!(MetricsService::new().is_ok());
    }

    #[test]
    fn rendered_output_includes_registered_metric_names() {
        let service = MetricsService::new().unwrap();
        service.record_file_status("OK");
        service.record_persist_counts(3, 5, 2, 1);
        service.set_queue_depth(42);

        let rendered = service.render().unwrap();
        assert!(rendered.contains("ingestion_files_by_status_total"));
        assert!(rendered.contains("ingestion_claims_inserted_total"));
        assert!(rendered.contains("ingestion_queue_depth"));
    }
}
