//! `guestcall-bridge`: Wasmtime-backed calling convention for typed guest calls.
//!
//! This crate instantiates a guest module and calls its exports with typed
//! argument lists, over the wire ABI defined in `guestcall-abi`. It provides:
//!
//! - **Memory access:** bounds-checked reads and writes of the exported memory
//! - **Allocator client:** argument buffers come from the guest's own
//!   `allocate` / `deallocate` exports and are always released
//! - **Two result protocols:** a synchronous result descriptor, or
//!   `return_result` / `return_error` callbacks with a deadline
//! - **Resource limits:** fuel metering and bounded memory growth
//! - **Contract validation:** required exports checked before instantiation
//!
//! The primary entry point is [`Bridge::call`].

pub mod error;
pub mod config;
pub mod memory;
pub mod host_impl;
pub mod allocator;
pub mod rendezvous;
pub mod linker;
pub mod protocol;
pub mod validation;
pub mod runtime;

pub use error::BridgeError;
pub use config::BridgeConfig;
pub use protocol::{CallbackProtocol, HeaderProtocol, ResultProtocol};
pub use runtime::{Bridge, CallbackBridge, HeaderBridge};

pub use guestcall_abi::{HostValue, TypeTag, UnknownTagPolicy};
