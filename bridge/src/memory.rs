//! Bounds-checked access to a wasmtime guest memory.
//!
//! The slice helpers validate `[ptr, ptr + len)` against the memory's
//! current length before copying. `GuestMemory` wraps an exported
//! `wasmtime::Memory` together with any store context (a `Store`, or the
//! `Caller` inside a host function) and implements [`LinearMemory`] on top
//! of them. Nothing is cached: each access looks at the memory as it is now.

use guestcall_abi::traits::checked_range;
use guestcall_abi::{AbiError, LinearMemory};
use wasmtime::{AsContextMut, Memory};

/// Read `len` bytes from guest memory at `ptr`.
///
/// Returns `Err(OutOfBounds)` if the range `[ptr, ptr+len)` is out of bounds.
pub fn read_bytes(mem: &[u8], ptr: u32, len: u32) -> Result<Vec<u8>, AbiError> {
    let range = checked_range(ptr, len, mem.len())?;
    Ok(mem[range].to_vec())
}

/// Write `data` bytes to guest memory at `ptr`.
///
/// Returns `Err(OutOfBounds)` if the range `[ptr, ptr+data.len())` is out of bounds.
pub fn write_bytes(mem: &mut [u8], ptr: u32, data: &[u8]) -> Result<(), AbiError> {
    let len = u32::try_from(data.len())
        .map_err(|_| AbiError::out_of_bounds(ptr, u32::MAX, mem.len()))?;
    let range = checked_range(ptr, len, mem.len())?;
    mem[range].copy_from_slice(data);
    Ok(())
}

/// An exported memory paired with the store context used to reach it.
pub struct GuestMemory<C> {
    memory: Memory,
    ctx: C,
}

impl<C: AsContextMut> GuestMemory<C> {
    pub fn new(memory: Memory, ctx: C) -> Self {
        Self { memory, ctx }
    }

    /// Give the store context back.
    pub fn into_inner(self) -> C {
        self.ctx
    }

    pub(crate) fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }
}

impl<C: AsContextMut> LinearMemory for GuestMemory<C> {
    fn size(&self) -> usize {
        self.memory.data_size(&self.ctx)
    }

    fn read(&self, addr: u32, len: u32) -> Result<Vec<u8>, AbiError> {
        read_bytes(self.memory.data(&self.ctx), addr, len)
    }

    fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<(), AbiError> {
        write_bytes(self.memory.data_mut(&mut self.ctx), addr, bytes)
    }
}
