//! Bridge error types.
//!
//! `BridgeError` is the outcome taxonomy of a guest call. Every variant is
//! surfaced to the caller once; nothing is retried.

use guestcall_abi::AbiError;

/// Top-level error type for the bridge crate.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Wasmtime engine, compilation, linking, or instantiation error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// Module validation failed (missing memory, bad allocator signatures).
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The requested export does not exist or is not a function.
    #[error("missing export: {0}")]
    MissingExport(String),

    /// A host value has no wire encoding. Raised before the guest is invoked.
    #[error("unsupported argument type: {0}")]
    UnsupportedArgumentType(String),

    /// The guest `allocate` / `deallocate` export trapped or is unusable.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    /// A read or write ran past the end of guest memory.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    /// The invoked export trapped.
    #[error("guest trapped: {0}")]
    GuestTrapped(String),

    /// Fuel exhausted while the guest was running.
    #[error("fuel exhausted (instruction limit)")]
    FuelExhausted,

    /// The guest returned an error payload. A normal business outcome.
    #[error("guest reported error: {0}")]
    GuestReportedError(String),

    /// The guest broke the result contract: unknown tag, malformed record,
    /// wrong export signature, or a callback that never (or twice) fired.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl BridgeError {
    /// True when the guest itself reported the error, as opposed to a
    /// failure of the bridge or the sandbox.
    pub fn is_guest_reported(&self) -> bool {
        matches!(self, Self::GuestReportedError(_))
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }
}

impl From<AbiError> for BridgeError {
    fn from(err: AbiError) -> Self {
        match err {
            AbiError::OutOfBounds { .. } => Self::OutOfBounds(err.to_string()),
            AbiError::AllocationFailed(msg) => Self::AllocationFailed(msg),
            AbiError::FuelExhausted(_) => Self::FuelExhausted,
            AbiError::UnsupportedArgumentType(msg) => Self::UnsupportedArgumentType(msg),
            AbiError::UnknownTag(_) | AbiError::Malformed(_) => {
                Self::ProtocolViolation(err.to_string())
            }
        }
    }
}
