// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C3 (local-fs variant): watches a `ready/` directory, offers each
//! file it finds as a `WorkItem`, then relocates it to `archive/` or
//! `failed/` depending on whether the queue accepted it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use claims_ingest_domain::services::{CancellationSignal, Fetcher, WorkItem, WorkItemSource, WorkQueue};
use claims_ingest_domain::IngestionError;

use crate::infrastructure::runtime::WatermarkGate;

const OFFER_TIMEOUT: Duration = Duration::from_millis(250);

pub struct LocalFsFetcher {
    ready_dir: PathBuf,
    archive_dir: PathBuf,
    failed_dir: PathBuf,
    poll_interval: Duration,
    gate: WatermarkGate,
}

impl LocalFsFetcher {
    pub fn new(root: impl AsRef<Path>, poll_interval: Duration) -> Self {
        let root = root.as_ref();
        Self {
            ready_dir: root.join("ready"),
            archive_dir: root.join("archive"),
            failed_dir: root.join("failed"),
            poll_interval,
            gate: WatermarkGate::default(),
        }
    }

    async fn poll_once(&self, queue: &dyn WorkQueue) -> Result<(), IngestionError> {
        let mut entries = match tokio::fs::read_dir(&self.ready_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(&self.ready_dir).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            self.handle_file(queue, &path).await;
        }
        Ok(())
    }

    async fn handle_file(&self, queue: &dyn WorkQueue, path: &Path) {
        let file_id = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed reading ready file");
                self.relocate(path, &self.failed_dir).await;
                return;
            }
        };

        // Bytes are fully read before the file moves to archive/, so the
        // payload always travels inline and nothing is staged.
        let item = WorkItem {
            file_id: file_id.clone(),
            bytes,
            source_path: None,
            source: WorkItemSource::LocalFs,
            correlation_id: file_id,
        };

        if queue.offer(item, OFFER_TIMEOUT).await {
            self.relocate(path, &self.archive_dir).await;
        } else {
            warn!(path = %path.display(), "queue rejected file within offer timeout, leaving in place for next poll");
        }
    }

    async fn relocate(&self, path: &Path, destination_dir: &Path) {
        if let Err(e) = tokio::fs::create_dir_all(destination_dir).await {
            error!(dir = %destination_dir.display(), error = %e, "failed creating relocation directory");
            return;
        }
        let Some(file_name) = path.file_name() else { return };
        let destination = destination_dir.join(file_name);
        if let Err(e) = tokio::fs::rename(path, &destination).await {
            error!(from = %path.display(), to = %destination.display(), error = %e, "failed relocating ready file");
        }
    }
}

#[async_trait]
impl Fetcher for LocalFsFetcher {
    async fn run(&self, queue: &dyn WorkQueue, cancel: &dyn CancellationSignal) -> Result<(), IngestionError> {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = interval.tick() => {
                    if !self.gate.permits(queue) {
                        continue;
                    }
                    if let Err(e) = self.poll_once(queue).await {
                        error!(error = ?e, "local-fs fetcher poll failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims_ingest_domain::services::WorkItem as DomainWorkItem;
    use tokio::sync::Mutex;

    struct AcceptingQueue {
        offered: Mutex<Vec<DomainWorkItem>>,
        accept: bool,
    }

    #[async_trait]
    impl WorkQueue for AcceptingQueue {
        async fn offer(&self, item: DomainWorkItem, _timeout: Duration) -> bool {
            if self.accept {
                self.offered.lock().await.push(item);
            }
            self.accept
        }
        async fn take(&self) -> DomainWorkItem {
            unimplemented!()
        }
        fn depth(&self) -> usize {
            0
        }
        fn remaining_capacity(&self) -> usize {
            1
        }
        fn capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn accepted_file_moves_to_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = LocalFsFetcher::new(tmp.path(), Duration::from_millis(10));
        tokio::fs::create_dir_all(tmp.path().join("ready")).await.unwrap();
        tokio::fs::write(tmp.path().join("ready/claim1.xml"), b"<Claim.Submission/>").await.unwrap();

        let queue = AcceptingQueue { offered: Mutex::new(Vec::new()), accept: true };
        fetcher.poll_once(&queue).await.unwrap();

        assert!(tmp.path().join("archive/claim1.xml").exists());
        assert!(!tmp.path().join("ready/claim1.xml").exists());
        assert_eq!(queue.offered.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn rejected_file_stays_in_ready_for_retry() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = LocalFsFetcher::new(tmp.path(), Duration::from_millis(10));
        tokio::fs::create_dir_all(tmp.path().join("ready")).await.unwrap();
        tokio::fs::write(tmp.path().join("ready/claim1.xml"), b"<Claim.Submission/>").await.unwrap();

        let queue = AcceptingQueue { offered: Mutex::new(Vec::new()), accept: false };
        fetcher.poll_once(&queue).await.unwrap();

        assert!(tmp.path().join("ready/claim1.xml").exists());
    }
}
