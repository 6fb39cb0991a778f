// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C9: read-only, post-commit verification. A check that cannot be
//! evaluated (a query error, a missing row) counts as failed rather than
//! propagating — the verifier never throws, per the port's contract.

use async_trait::async_trait;
use tracing::warn;

use claims_ingest_domain::services::{VerifyExpectations, Verifier};
use claims_ingest_domain::value_objects::IngestionFileId;

use crate::infrastructure::db::PgPool;

pub struct SqlxVerifier {
    pool: PgPool,
}

impl SqlxVerifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn has_at_least_one_event(&self, ingestion_file_id: IngestionFileId) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("select count(*) from claims.claim_event where ingestion_file_id = $1")
            .bind(ingestion_file_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count >= 1)
    }

    async fn persisted_claim_count(&self, ingestion_file_id: IngestionFileId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "select count(distinct claim_key_id) from claims.claim_event where ingestion_file_id = $1",
        )
        .bind(ingestion_file_id.to_string())
        .fetch_one(&self.pool)
        .await
    }

    async fn persisted_activity_count(&self, ingestion_file_id: IngestionFileId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "select count(*) from claims.claim_event_activity cea \
             join claims.claim_event ce on ce.id = cea.claim_event_id \
             where ce.ingestion_file_id = $1",
        )
        .bind(ingestion_file_id.to_string())
        .fetch_one(&self.pool)
        .await
    }

    /// No `activity.claim_id` should point at a claim row no longer
    /// reachable from any event; no `claim_event_activity`/
    /// `event_observation` row should be orphaned from its parent.
    async fn no_orphans(&self) -> Result<bool, sqlx::Error> {
        let orphan_activities: i64 = sqlx::query_scalar(
            "select count(*) from claims.activity a \
             left join claims.claim c on c.id = a.claim_id \
             where c.id is null",
        )
        .fetch_one(&self.pool)
        .await?;

        let orphan_event_activities: i64 = sqlx::query_scalar(
            "select count(*) from claims.claim_event_activity cea \
             left join claims.claim_event ce on ce.id = cea.claim_event_id \
             where ce.id is null",
        )
        .fetch_one(&self.pool)
        .await?;

        let orphan_observations: i64 = sqlx::query_scalar(
            "select count(*) from claims.event_observation eo \
             left join claims.claim_event_activity cea on cea.id = eo.claim_event_activity_id \
             where cea.id is null",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(orphan_activities == 0 && orphan_event_activities == 0 && orphan_observations == 0)
    }
}

#[async_trait]
impl Verifier for SqlxVerifier {
    async fn verify(&self, ingestion_file_id: IngestionFileId, expectations: VerifyExpectations) -> bool {
        let checks = async {
            if !self.has_at_least_one_event(ingestion_file_id).await? {
                return Ok::<bool, sqlx::Error>(false);
            }

            if let Some(expected) = expectations.expected_claims {
                let persisted = self.persisted_claim_count(ingestion_file_id).await?;
                if persisted < expected as i64 {
                    return Ok(false);
                }
            }

            if let Some(expected) = expectations.expected_activities {
                let persisted = self.persisted_activity_count(ingestion_file_id).await?;
                if persisted < expected as i64 {
                    return Ok(false);
                }
            }

            self.no_orphans().await
        };

        match checks.await {
            Ok(passed) => passed,
            Err(e) => {
                warn!(ingestion_file_id = %ingestion_file_id, error = %e, "verification query failed, treating file as unverified");
                false
            }
        }
    }
}
