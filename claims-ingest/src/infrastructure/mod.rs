// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Every adapter that implements a `claims-ingest-domain` service port
//! lives here, grouped by concern: `adapters` (fetch/credential/SOAP),
//! `parsing` (C6), `runtime` (C4/C5 queue and orchestrator), `db`
//! (connection pool and migrations), `metrics`/`logging` (C11's
//! observability half), and `config` (layered `AppConfig`).

pub mod adapters;
pub mod config;
pub mod db;
pub mod logging;
pub mod metrics;
pub mod parsing;
pub mod runtime;
pub mod services;
