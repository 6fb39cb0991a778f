// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Supervised task spawning. Every worker and fetch loop is started
//! through here rather than raw `tokio::spawn`, so a panic never
//! disappears silently into a dropped `JoinHandle`.

use tokio::task::JoinHandle;
use tracing::{debug, error};

use claims_ingest_domain::IngestionError;

pub type AppResult<T> = Result<T, IngestionError>;

pub fn spawn_supervised<F, T>(name: &'static str, fut: F) -> JoinHandle<AppResult<T>>
where
    F: std::future::Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    debug!(task = name, "task starting");

    tokio::spawn(async move {
        let result = fut.await;
        match &result {
            Ok(_) => debug!(task = name, "task completed successfully"),
            Err(e) => error!(task = name, error = ?e, "task failed"),
        }
        result
    })
}

pub async fn join_supervised<T>(handle: JoinHandle<AppResult<T>>) -> AppResult<T> {
    match handle.await {
        Ok(task_result) => task_result,
        Err(e) if e.is_panic() => Err(IngestionError::internal(format!("task panicked: {e}"))),
        Err(e) if e.is_cancelled() => Err(IngestionError::Cancelled("task cancelled".to_string())),
        Err(e) => Err(IngestionError::internal(format!("task join failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn supervised_success_round_trips_value() {
        let handle = spawn_supervised("test-success", async { Ok::<i32, IngestionError>(42) });
        let result = join_supervised(handle).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn supervised_error_propagates() {
        let handle = spawn_supervised("test-error", async { Err::<(), _>(IngestionError::validation("bad")) });
        assert!(join_supervised(handle).await.is_err());
    }

    #[tokio::test]
    async fn panic_becomes_internal_error() {
        let handle: JoinHandle<AppResult<()>> = tokio::spawn(async {
            panic!("boom");
            #[allow(unreachable_code)]
            Ok(())
        });
        let result = join_supervised(handle).await;
        assert!(result.unwrap_err().to_string().contains("panicked"));
    }
}
