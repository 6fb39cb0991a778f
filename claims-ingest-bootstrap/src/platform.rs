// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction Module
//!
//! OS-specific queries the bootstrap layer needs at startup: the host's
//! resource envelope (CPU count, page size, memory) and whether the
//! process is running with elevated privileges. The composition root
//! logs these once as a deploy sanity check and warns when run as root,
//! which this engine never needs to be.
//!
//! Compile-time selection via `#[cfg]`: `UnixPlatform` (POSIX, Linux +
//! macOS) or `WindowsPlatform`.

use thiserror::Error;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;

#[cfg(windows)]
pub use windows::WindowsPlatform;

/// Platform-specific errors
#[derive(Debug, Error)]
pub enum PlatformError {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Feature not supported on this platform
    #[error("Not supported on this platform: {0}")]
    NotSupported(String),

    /// Generic platform error
    #[error("Platform error: {0}")]
    Other(String),
}

/// Stateless, thread-safe OS queries. Implementations use native
/// platform APIs (POSIX via `libc` and `/proc` on Unix, `winapi` on
/// Windows) and fall back to standard Rust APIs where those suffice.
pub trait Platform: Send + Sync {
    /// System page size in bytes (typically 4096).
    fn page_size(&self) -> usize;

    /// Number of logical processors available to the process (at least 1).
    fn cpu_count(&self) -> usize;

    /// Total physical memory in bytes.
    fn total_memory(&self) -> Result<u64, PlatformError>;

    /// Available (free) memory in bytes.
    fn available_memory(&self) -> Result<u64, PlatformError>;

    /// Platform identifier: "linux", "macos", "windows", etc.
    fn platform_name(&self) -> &'static str;

    /// Whether the process runs with elevated privileges (root on Unix,
    /// Administrator on Windows).
    fn is_elevated(&self) -> bool;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

/// Returns the implementation for the current operating system,
/// selected at compile time.
pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_platform() {
        let platform = create_platform();

        // Should have at least one CPU
        assert!(platform.cpu_count() >= 1);

        // Page size should be reasonable
        let page_size = platform.page_size();
        assert!(page_size >= 512);
        assert!(page_size <= 65536);

        // Platform name should not be empty
        assert!(!platform.platform_name().is_empty());
    }

    #[test]
    fn test_memory_queries_return_plausible_values() {
        let platform = create_platform();
        let total = platform.total_memory().unwrap();
        let available = platform.available_memory().unwrap();
        assert!(total > 0);
        assert!(available <= total);
    }

    #[test]
    fn test_is_elevated_does_not_panic() {
        let platform = create_platform();
        let _ = platform.is_elevated();
    }
}
