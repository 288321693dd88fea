//! Bridge configuration.

use std::time::Duration;

use guestcall_abi::UnknownTagPolicy;

/// Configuration for a guest bridge.
///
/// Controls memory limits, instruction fuel, the callback rendezvous
/// deadline, and the names the guest contract is resolved under.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Maximum linear memory pages (1 page = 64 KiB).
    /// Default: 256 pages = 16 MiB.
    pub max_memory_pages: u32,

    /// Wasmtime fuel granted to each call. `None` disables metering.
    pub fuel_limit: Option<u64>,

    /// How long the callback protocol waits for `return_result` /
    /// `return_error` after the export returns.
    pub callback_timeout: Duration,

    /// Handling of result entries with an unknown type tag.
    pub unknown_tags: UnknownTagPolicy,

    /// Name of the guest's exported linear memory.
    pub memory_export: String,

    /// Import module the result callbacks are registered under.
    pub callback_module: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: 256,       // 16 MiB
            fuel_limit: Some(100_000_000),
            callback_timeout: Duration::from_secs(1),
            unknown_tags: UnknownTagPolicy::Reject,
            memory_export: "memory".into(),
            callback_module: "env".into(),
        }
    }
}

impl BridgeConfig {
    /// Memory limit in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_pages as usize * 65536
    }
}
