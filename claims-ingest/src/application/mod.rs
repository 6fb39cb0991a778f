// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application layer: wires the domain ports into the one use case this
//! engine has, a per-file pipeline, matching the shape
//! `infrastructure::runtime::Orchestrator` drives.

pub mod process_file;

pub use process_file::{PipelineConfig, ProcessFilePipeline};
