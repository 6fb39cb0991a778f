// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C5: the orchestrator. A single periodic tick drains the queue into a
//! bounded worker pool; pause/resume suppresses new drains without
//! touching in-flight tasks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use claims_ingest_domain::services::{WorkItem, WorkQueue};
use claims_ingest_domain::value_objects::IngestionRunId;

use crate::infrastructure::adapters::SqlxAuditSink;

use super::supervisor::{join_supervised, spawn_supervised};
use super::work_queue::BoundedWorkQueue;

pub struct OrchestratorConfig {
    pub tick_period: Duration,
    pub drain_batch_size: usize,
    pub worker_count: usize,
    /// Per-file wall-clock budget. A task past it is aborted; the
    /// dropped sqlx transaction rolls back, so no partial writes
    /// survive.
    pub task_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(500),
            drain_batch_size: 32,
            worker_count: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            task_timeout: Duration::from_secs(300),
        }
    }
}

/// Runs the periodic drain. `process` is the per-file pipeline (parse →
/// persist → verify → ack), invoked once per drained `WorkItem` together
/// with the id of the `ingestion_run` row this drain belongs to.
pub struct Orchestrator<F> {
    queue: Arc<BoundedWorkQueue>,
    config: OrchestratorConfig,
    process: Arc<F>,
    audit: Arc<SqlxAuditSink>,
    paused: AtomicBool,
    heartbeat: AtomicU64,
    current_run: tokio::sync::Mutex<Option<(IngestionRunId, i32)>>,
}

impl<F, Fut> Orchestrator<F>
where
    F: Fn(WorkItem, IngestionRunId) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = claims_ingest_domain::DomainResult<()>> + Send + 'static,
{
    pub fn new(queue: Arc<BoundedWorkQueue>, config: OrchestratorConfig, audit: Arc<SqlxAuditSink>, process: F) -> Arc<Self> {
        Arc::new(Self {
            queue,
            config,
            process: Arc::new(process),
            audit,
            paused: AtomicBool::new(false),
            heartbeat: AtomicU64::new(0),
            current_run: tokio::sync::Mutex::new(None),
        })
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn heartbeat(&self) -> u64 {
        self.heartbeat.load(Ordering::SeqCst)
    }

    /// Runs until `cancel` resolves. Each tick drains up to
    /// `drain_batch_size` items and spawns one supervised task per item,
    /// bounded to `worker_count` concurrent tasks via a semaphore.
    pub async fn run(self: Arc<Self>, cancel: Arc<dyn claims_ingest_domain::services::CancellationSignal>) {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.worker_count));
        let mut interval = tokio::time::interval(self.config.tick_period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("orchestrator received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    self.heartbeat.fetch_add(1, Ordering::SeqCst);
                    if self.is_paused() {
                        continue;
                    }
                    self.drain_once(&semaphore).await;
                }
            }
        }
    }

    async fn drain_once(self: &Arc<Self>, semaphore: &Arc<tokio::sync::Semaphore>) {
        if self.queue.depth() == 0 {
            return;
        }

        let run_id = match self.ensure_run_open().await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = ?e, "failed to open ingestion run");
                return;
            }
        };

        let mut drained = Vec::new();
        for _ in 0..self.config.drain_batch_size {
            if self.queue.depth() == 0 {
                break;
            }
            drained.push(self.queue.take().await);
        }
        if drained.is_empty() {
            return;
        }
        let drained_count = drained.len() as i32;

        let mut handles = Vec::with_capacity(drained.len());
        for item in drained {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let process = self.process.clone();
            let budget = self.config.task_timeout;
            handles.push(spawn_supervised("process-file", async move {
                let _permit = permit;
                let file_id = item.file_id.clone();
                match tokio::time::timeout(budget, process(item, run_id)).await {
                    Ok(result) => result,
                    Err(_) => Err(claims_ingest_domain::IngestionError::Cancelled(format!(
                        "file {file_id} exceeded the {budget:?} processing budget"
                    ))),
                }
            }));
        }
        for handle in handles {
            if let Err(e) = join_supervised(handle).await {
                warn!(error = ?e, "processFile task failed");
            }
        }

        {
            let mut run = self.current_run.lock().await;
            if let Some((_, count)) = run.as_mut() {
                *count += drained_count;
            }
        }

        if self.queue.depth() == 0 {
            self.close_run().await;
        }
    }

    /// Returns the id of the currently open run, opening a new
    /// `ingestion_run` row if this drain is the first since the queue last
    /// emptied.
    async fn ensure_run_open(&self) -> claims_ingest_domain::DomainResult<IngestionRunId> {
        let mut run = self.current_run.lock().await;
        if let Some((id, _)) = *run {
            return Ok(id);
        }
        let id = self.audit.open_run(Utc::now()).await?;
        *run = Some((id, 0));
        Ok(id)
    }

    async fn close_run(&self) {
        let finished = self.current_run.lock().await.take();
        if let Some((id, files_processed)) = finished {
            if let Err(e) = self.audit.close_run(id, files_processed, Utc::now()).await {
                warn!(error = ?e, "failed to close ingestion run");
            }
        }
    }
}
