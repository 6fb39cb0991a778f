// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C4: the bounded work queue. Built on `Mutex<VecDeque>` + `Notify`
//! rather than `tokio::sync::mpsc` because the back-pressure watermark
//! rule needs `depth()`/`remaining_capacity()`, which `mpsc` does not
//! expose.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use claims_ingest_domain::services::{WorkItem, WorkQueue as WorkQueueTrait};

pub const DEFAULT_PAUSE_HIGH_WATERMARK_PCT: u8 = 75;
pub const DEFAULT_RESUME_LOW_WATERMARK_PCT: u8 = 50;

pub struct BoundedWorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
    depth: AtomicUsize,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
}

impl BoundedWorkQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            depth: AtomicUsize::new(0),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        })
    }

    fn try_push(&self, item: WorkItem, guard: &mut VecDeque<WorkItem>) -> Option<WorkItem> {
        if guard.len() >= self.capacity {
            return Some(item);
        }
        guard.push_back(item);
        self.depth.store(guard.len(), Ordering::SeqCst);
        None
    }
}

/// The advisory back-pressure rule for producers: pause offering once
/// depth crosses the high watermark (default 75% of capacity), resume
/// once it falls back to the low watermark (default 50%). Hysteresis
/// keeps a fetcher from flapping at the boundary.
pub struct WatermarkGate {
    high_pct: u8,
    low_pct: u8,
    paused: AtomicBool,
}

impl WatermarkGate {
    pub fn new(high_pct: u8, low_pct: u8) -> Self {
        Self { high_pct, low_pct, paused: AtomicBool::new(false) }
    }

    /// Whether the producer may offer work this tick, updating the
    /// pause state from the queue's current depth.
    pub fn permits(&self, queue: &dyn WorkQueueTrait) -> bool {
        let depth_pct = queue.depth() * 100;
        let capacity = queue.capacity();
        if self.paused.load(Ordering::SeqCst) {
            if depth_pct <= capacity * self.low_pct as usize {
                self.paused.store(false, Ordering::SeqCst);
                return true;
            }
            false
        } else {
            if depth_pct >= capacity * self.high_pct as usize {
                self.paused.store(true, Ordering::SeqCst);
                return false;
            }
            true
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

impl Default for WatermarkGate {
    fn default() -> Self {
        Self::new(DEFAULT_PAUSE_HIGH_WATERMARK_PCT, DEFAULT_RESUME_LOW_WATERMARK_PCT)
    }
}

#[async_trait]
impl WorkQueueTrait for BoundedWorkQueue {
    async fn offer(&self, item: WorkItem, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut item = item;
        loop {
            {
                let mut guard = self.items.lock().await;
                match self.try_push(item, &mut guard) {
                    None => {
                        drop(guard);
                        self.not_empty.notify_one();
                        return true;
                    }
                    Some(rejected) => item = rejected,
                }
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            tokio::select! {
                _ = self.not_full.notified() => {}
                _ = tokio::time::sleep(remaining) => return false,
            }
        }
    }

    async fn take(&self) -> WorkItem {
        loop {
            {
                let mut guard = self.items.lock().await;
                if let Some(item) = guard.pop_front() {
                    self.depth.store(guard.len(), Ordering::SeqCst);
                    drop(guard);
                    self.not_full.notify_one();
                    return item;
                }
            }
            self.not_empty.notified().await;
        }
    }

    fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.depth())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims_ingest_domain::services::WorkItemSource;

    fn item(id: &str) -> WorkItem {
        WorkItem {
            file_id: id.to_string(),
            bytes: vec![],
            source_path: None,
            source: WorkItemSource::LocalFs,
            correlation_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn offer_then_take_round_trips() {
        let queue = BoundedWorkQueue::new(4);
        assert!(queue.offer(item("a"), Duration::from_millis(50)).await);
        assert_eq!(queue.depth(), 1);
        let taken = queue.take().await;
        assert_eq!(taken.file_id, "a");
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test]
    async fn offer_times_out_when_full() {
        let queue = BoundedWorkQueue::new(1);
        assert!(queue.offer(item("a"), Duration::from_millis(50)).await);
        let second = queue.offer(item("b"), Duration::from_millis(50)).await;
        assert!(!second);
    }

    #[tokio::test]
    async fn watermark_gate_pauses_and_resumes_with_hysteresis() {
        let queue = BoundedWorkQueue::new(4);
        let gate = WatermarkGate::default();

        for i in 0..3 {
            queue.offer(item(&i.to_string()), Duration::from_millis(50)).await;
        }
        // 3/4 = 75% crosses the high watermark
        assert!(!gate.permits(&*queue));
        assert!(gate.is_paused());

        // 2/4 = 50% is back at the low watermark
        queue.take().await;
        assert!(gate.permits(&*queue));
        assert!(!gate.is_paused());
    }

    #[tokio::test]
    async fn remaining_capacity_tracks_depth() {
        let queue = BoundedWorkQueue::new(4);
        queue.offer(item("a"), Duration::from_millis(50)).await;
        assert_eq!(queue.remaining_capacity(), 3);
    }
}
