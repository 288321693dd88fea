//! In-memory guest for testing.
//!
//! `MemGuest` implements [`LinearMemory`] and [`GuestAllocator`] over a
//! `Vec<u8>` with a bump allocator, and records every allocate/deallocate so
//! tests can check the release invariant without a wasm engine. Fault
//! injection knobs simulate a guest whose allocator traps or hands out bad
//! addresses.

use crate::error::AbiError;
use crate::traits::{checked_range, GuestAllocator, LinearMemory};

/// Round `size` up to the next multiple of 8.
fn align8(size: usize) -> usize {
    (size + 7) & !7
}

/// Bump allocator over a fixed region. Freed space is never reused.
#[derive(Debug, Clone)]
struct Bump {
    base: usize,
    offset: usize,
    capacity: usize,
}

impl Bump {
    fn take(&mut self, size: usize) -> Option<usize> {
        let aligned = align8(size.max(1));
        if self.offset + aligned > self.capacity {
            return None;
        }
        let ptr = self.base + self.offset;
        self.offset += aligned;
        Some(ptr)
    }
}

/// A fake guest instance backed by host memory.
#[derive(Debug, Clone)]
pub struct MemGuest {
    memory: Vec<u8>,
    bump: Bump,
    allocations: Vec<u32>,
    deallocations: Vec<(u32, u32)>,
    live: Vec<(u32, u32)>,
    allocate_calls: usize,
    fail_allocation_at: Option<usize>,
    fail_deallocation: bool,
    fixed_pointer: Option<u32>,
}

impl MemGuest {
    /// Create a guest with `size` bytes of memory.
    ///
    /// Address 0 is never handed out, so a zero pointer always means "none".
    pub fn new(size: usize) -> Self {
        Self {
            memory: vec![0; size],
            bump: Bump {
                base: 8,
                offset: 0,
                capacity: size.saturating_sub(8),
            },
            allocations: Vec::new(),
            deallocations: Vec::new(),
            live: Vec::new(),
            allocate_calls: 0,
            fail_allocation_at: None,
            fail_deallocation: false,
            fixed_pointer: None,
        }
    }

    /// Make the `n`th call to `allocate` (1-based) fail.
    pub fn fail_allocation_at(mut self, n: usize) -> Self {
        self.fail_allocation_at = Some(n);
        self
    }

    /// Make every `deallocate` fail.
    pub fn fail_deallocation(mut self) -> Self {
        self.fail_deallocation = true;
        self
    }

    /// Have `allocate` return `ptr` regardless of size.
    pub fn hand_out_pointer(mut self, ptr: u32) -> Self {
        self.fixed_pointer = Some(ptr);
        self
    }

    /// Copy `bytes` into guest-owned memory (not tracked as an allocation).
    ///
    /// Stands in for buffers the guest itself builds, such as result records.
    pub fn place(&mut self, bytes: &[u8]) -> Result<u32, AbiError> {
        let ptr = self.bump.take(bytes.len()).ok_or_else(|| {
            AbiError::AllocationFailed(format!("out of memory placing {} bytes", bytes.len()))
        })?;
        self.memory[ptr..ptr + bytes.len()].copy_from_slice(bytes);
        Ok(ptr as u32)
    }

    /// Sizes of every successful allocation, in order.
    pub fn allocations(&self) -> &[u32] {
        &self.allocations
    }

    /// Every `(ptr, size)` passed to a successful `deallocate`, in order.
    pub fn deallocations(&self) -> &[(u32, u32)] {
        &self.deallocations
    }

    /// Number of allocations not yet released.
    pub fn outstanding(&self) -> usize {
        self.live.len()
    }
}

impl LinearMemory for MemGuest {
    fn size(&self) -> usize {
        self.memory.len()
    }

    fn read(&self, addr: u32, len: u32) -> Result<Vec<u8>, AbiError> {
        let range = checked_range(addr, len, self.memory.len())?;
        Ok(self.memory[range].to_vec())
    }

    fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<(), AbiError> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| AbiError::out_of_bounds(addr, u32::MAX, self.memory.len()))?;
        let range = checked_range(addr, len, self.memory.len())?;
        self.memory[range].copy_from_slice(bytes);
        Ok(())
    }
}

impl GuestAllocator for MemGuest {
    fn allocate(&mut self, size: u32) -> Result<u32, AbiError> {
        self.allocate_calls += 1;
        if self.fail_allocation_at == Some(self.allocate_calls) {
            return Err(AbiError::AllocationFailed(format!(
                "injected failure on allocation #{}",
                self.allocate_calls
            )));
        }
        let ptr = match self.fixed_pointer {
            Some(ptr) => ptr,
            None => self
                .bump
                .take(size as usize)
                .ok_or_else(|| AbiError::AllocationFailed(format!("out of memory for {} bytes", size)))?
                as u32,
        };
        self.allocations.push(size);
        self.live.push((ptr, size));
        Ok(ptr)
    }

    fn deallocate(&mut self, ptr: u32, size: u32) -> Result<(), AbiError> {
        if self.fail_deallocation {
            return Err(AbiError::AllocationFailed("injected deallocate failure".into()));
        }
        let index = self
            .live
            .iter()
            .position(|&entry| entry == (ptr, size))
            .ok_or_else(|| {
                AbiError::AllocationFailed(format!("no live allocation ({}, {})", ptr, size))
            })?;
        self.live.remove(index);
        self.deallocations.push((ptr, size));
        Ok(())
    }
}
