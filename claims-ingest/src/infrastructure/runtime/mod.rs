// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

pub mod orchestrator;
pub mod supervisor;
pub mod work_queue;

pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use work_queue::{BoundedWorkQueue, WatermarkGate};
