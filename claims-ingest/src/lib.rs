// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Claims Ingestion Engine
//!
//! Fetches Claim Submission and Remittance Advice XML — over SOAP
//! (DHPO-style) or from a watched directory — and projects it into
//! PostgreSQL as an idempotent, append-only event history. Business
//! rules and the service ports adapters implement live in
//! `claims-ingest-domain`; this crate supplies the adapters.
//!
//! ## Layout
//!
//! - [`application`] — the per-file pipeline: parse → persist → verify
//!   → ack, wired from the domain ports
//! - [`infrastructure`] — every concrete adapter: SOAP/local-fs fetch
//!   (C3), credential vault (C1), the streaming XML parser (C6), the
//!   sqlx-backed persist/verify/audit adapters (C7–C11), the bounded
//!   queue and orchestrator (C4/C5), config, logging, metrics
//! - [`presentation`] — the metrics/health HTTP surface; this engine
//!   has no interactive end users

pub mod application;
pub mod infrastructure;
pub mod presentation;
