// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::IngestionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItemSource {
    LocalFs,
    Soap,
}

/// The queue element handed from fetcher to orchestrator.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub file_id: String,
    /// The payload, when it is small enough to carry inline. Empty when
    /// the payload was staged to disk instead.
    pub bytes: Vec<u8>,
    /// Disk location of a payload too large to carry inline. The
    /// consumer reads the file on demand and removes it once the item
    /// has been processed; `None` whenever `bytes` is inline.
    pub source_path: Option<PathBuf>,
    pub source: WorkItemSource,
    pub correlation_id: String,
}

/// Port for C4: the seam a fetcher offers into and the orchestrator
/// takes from.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn offer(&self, item: WorkItem, timeout: Duration) -> bool;
    async fn take(&self) -> WorkItem;
    fn depth(&self) -> usize;
    fn remaining_capacity(&self) -> usize;
    fn capacity(&self) -> usize;
}

/// Port for C3. Both the local-fs fetcher and the SOAP coordinator
/// implement this; only one is active per deployment.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Runs the fetcher's own loop (directory poll or per-facility
    /// tick) until cancelled, offering `WorkItem`s into the queue.
    async fn run(&self, queue: &dyn WorkQueue, cancel: &dyn crate::services::CancellationSignal) -> Result<(), IngestionError>;
}
