//! Per-instance mutable state held in the Wasmtime Store.
//!
//! `HostState` carries the memory limiter and, while a callback-protocol
//! call is in flight, the resolver the host callbacks deliver into.

use guestcall_abi::UnknownTagPolicy;
use wasmtime::{StoreLimits, StoreLimitsBuilder};

use crate::config::BridgeConfig;
use crate::rendezvous::Resolver;

/// Per-instance mutable state held in the Wasmtime `Store`.
pub struct HostState {
    /// Linear memory growth limit.
    pub limits: StoreLimits,
    /// Slot for the in-flight callback call; `None` between calls.
    pub resolver: Option<Resolver>,
    /// Policy applied when decoding callback payloads.
    pub unknown_tags: UnknownTagPolicy,
    /// Export name of the guest memory the callbacks read from.
    pub memory_export: String,
}

impl HostState {
    pub fn new(config: &BridgeConfig) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(config.max_memory_bytes())
            .instances(1)
            .build();
        Self {
            limits,
            resolver: None,
            unknown_tags: config.unknown_tags,
            memory_export: config.memory_export.clone(),
        }
    }

    /// Park `resolver` for the duration of one call.
    pub fn arm(&mut self, resolver: Resolver) {
        self.resolver = Some(resolver);
    }

    /// Clear the resolver once the export has returned.
    pub fn disarm(&mut self) {
        self.resolver = None;
    }
}
