//! ABI-level error types.
//!
//! `AbiError` describes failures while moving values across the guest
//! boundary: bad addresses, allocator failures, and records that do not
//! match the wire contract. The engine-backed bridge maps these onto its
//! call outcome taxonomy.

/// Error raised by the value codec, the argument frame, or result decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    /// The range `[addr, addr + len)` exceeds the current memory size.
    #[error("out of bounds: addr={addr}, len={len}, memory size={size}")]
    OutOfBounds { addr: u32, len: u32, size: usize },

    /// The guest `allocate` / `deallocate` export failed or is missing.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    /// The guest ran out of its execution budget inside an allocator export.
    #[error("fuel exhausted during {0}")]
    FuelExhausted(String),

    /// The host value has no encoding in the wire contract.
    #[error("unsupported argument type: {0}")]
    UnsupportedArgumentType(String),

    /// A result record carried a tag outside the closed set.
    #[error("unknown type tag {0}")]
    UnknownTag(i32),

    /// A record does not agree with its declared shape.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl AbiError {
    /// Create an out-of-bounds error for a range check against `size`.
    pub fn out_of_bounds(addr: u32, len: u32, size: usize) -> Self {
        Self::OutOfBounds { addr, len, size }
    }

    /// Create a malformed-payload error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
