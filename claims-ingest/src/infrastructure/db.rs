// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Connection pool setup and schema migration for the `claims` /
//! `claims_ref` Postgres schemas. One pool is shared by the writer, the
//! verifier, and the audit sink; the read-write/read-only role split is
//! an operator-side Postgres GRANT concern, not something this pool
//! configuration encodes.

use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::Pool;

use claims_ingest_domain::IngestionError;

use super::config::DatabaseConfig;

pub type PgPool = Pool<Postgres>;

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, IngestionError> {
    PgPoolOptions::new()
        .max_connections(config.pool_size)
        .connect(&config.url)
        .await
        .map_err(|e| IngestionError::persistence(format!("failed to connect to database: {e}")))
}

/// Runs the embedded migrations in `migrations/`. Safe to call on every
/// startup: `sqlx::migrate!` tracks what has already run.
pub async fn migrate(pool: &PgPool) -> Result<(), IngestionError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| IngestionError::persistence(format!("migration failed: {e}")))
}
