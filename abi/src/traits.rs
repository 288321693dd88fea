//! Seams between the marshaling logic and a concrete guest.
//!
//! The argument frame and result decoding only ever touch guest memory
//! through [`LinearMemory`] and only obtain or release guest buffers through
//! [`GuestAllocator`]. The bridge crate implements both over a wasmtime
//! instance; [`MemGuest`](crate::MemGuest) implements them in memory for
//! tests.

use crate::error::AbiError;

/// Bounds-checked access to a guest's linear memory.
///
/// Implementations must not cache: every call reflects the memory as it is
/// now, since the guest may grow it between calls.
pub trait LinearMemory {
    /// Current size of the memory in bytes.
    fn size(&self) -> usize;

    /// Copy `len` bytes starting at `addr`.
    ///
    /// Fails with `AbiError::OutOfBounds` if the range exceeds [`size`](Self::size).
    fn read(&self, addr: u32, len: u32) -> Result<Vec<u8>, AbiError>;

    /// Write `bytes` starting at `addr`.
    ///
    /// Fails with `AbiError::OutOfBounds` if the range exceeds [`size`](Self::size).
    fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<(), AbiError>;
}

/// Client for the guest's exported `allocate` / `deallocate` functions.
pub trait GuestAllocator {
    /// Reserve `size` bytes of guest memory and return their address.
    fn allocate(&mut self, size: u32) -> Result<u32, AbiError>;

    /// Return a buffer previously obtained from [`allocate`](Self::allocate).
    fn deallocate(&mut self, ptr: u32, size: u32) -> Result<(), AbiError>;
}

/// Compute the exclusive end of `[addr, addr + len)` and check it against `size`.
pub fn checked_range(addr: u32, len: u32, size: usize) -> Result<core::ops::Range<usize>, AbiError> {
    let start = addr as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or_else(|| AbiError::out_of_bounds(addr, len, size))?;
    if end > size {
        return Err(AbiError::out_of_bounds(addr, len, size));
    }
    Ok(start..end)
}
