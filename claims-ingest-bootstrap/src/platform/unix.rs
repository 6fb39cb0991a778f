// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Unix Platform Implementation
//!
//! POSIX implementation backing [`super::Platform`] on Linux and
//! macOS, via `libc` and `/proc`.

use super::{Platform, PlatformError};

pub struct UnixPlatform;

impl UnixPlatform {
    pub fn new() -> Self {
        Self
    }

    fn meminfo_kb(label: &str) -> Option<u64> {
        let contents = std::fs::read_to_string("/proc/meminfo").ok()?;
        contents.lines().find_map(|line| {
            let rest = line.strip_prefix(label)?;
            rest.trim().trim_end_matches(" kB").parse::<u64>().ok()
        })
    }
}

impl Default for UnixPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for UnixPlatform {
    fn page_size(&self) -> usize {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as usize
        } else {
            4096
        }
    }

    fn cpu_count(&self) -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    fn total_memory(&self) -> Result<u64, PlatformError> {
        Self::meminfo_kb("MemTotal:")
            .map(|kb| kb * 1024)
            .ok_or_else(|| PlatformError::Other("MemTotal not found in /proc/meminfo".to_string()))
    }

    fn available_memory(&self) -> Result<u64, PlatformError> {
        Self::meminfo_kb("MemAvailable:")
            .map(|kb| kb * 1024)
            .ok_or_else(|| PlatformError::Other("MemAvailable not found in /proc/meminfo".to_string()))
    }

    fn platform_name(&self) -> &'static str {
        if cfg!(target_os = "macos") {
            "macos"
        } else {
            "linux"
        }
    }

    fn is_elevated(&self) -> bool {
        unsafe { libc::geteuid() == 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_platform_basics() {
        let platform = UnixPlatform::new();

        assert!(platform.cpu_count() >= 1);

        let page_size = platform.page_size();
        assert!(page_size >= 512);
        assert!(page_size <= 65536);
    }

    #[test]
    fn test_is_elevated_does_not_panic() {
        let platform = UnixPlatform::new();
        let _ = platform.is_elevated();
    }
}
