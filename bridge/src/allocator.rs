//! Guest allocator client.
//!
//! Every buffer the host places in guest memory is obtained from the
//! guest's own `allocate(size) -> ptr` export and handed back through
//! `deallocate(ptr, size)`. `Guest` pairs those exports with the memory
//! accessor so the argument frame can drive both through one handle.

use guestcall_abi::{AbiError, GuestAllocator, LinearMemory};
use tracing::trace;
use wasmtime::{Instance, Memory, Store, Trap, TypedFunc};

use crate::error::BridgeError;
use crate::host_impl::HostState;
use crate::memory::GuestMemory;

/// Name of the guest's allocation export.
pub const ALLOCATE_EXPORT: &str = "allocate";

/// Name of the guest's release export.
pub const DEALLOCATE_EXPORT: &str = "deallocate";

/// Handles to the guest exports every call relies on.
#[derive(Clone)]
pub struct GuestExports {
    pub memory: Memory,
    allocate: TypedFunc<i32, i32>,
    deallocate: TypedFunc<(i32, i32), ()>,
}

impl GuestExports {
    /// Resolve the memory and allocator exports of an instance.
    pub fn resolve(
        store: &mut Store<HostState>,
        instance: &Instance,
        memory_export: &str,
    ) -> Result<Self, BridgeError> {
        let memory = instance
            .get_memory(&mut *store, memory_export)
            .ok_or_else(|| BridgeError::MissingExport(memory_export.to_string()))?;
        let allocate = instance
            .get_typed_func::<i32, i32>(&mut *store, ALLOCATE_EXPORT)
            .map_err(|e| BridgeError::AllocationFailed(format!("{}: {}", ALLOCATE_EXPORT, e)))?;
        let deallocate = instance
            .get_typed_func::<(i32, i32), ()>(&mut *store, DEALLOCATE_EXPORT)
            .map_err(|e| BridgeError::AllocationFailed(format!("{}: {}", DEALLOCATE_EXPORT, e)))?;
        Ok(Self {
            memory,
            allocate,
            deallocate,
        })
    }
}

/// One guest instance seen through the ABI traits.
pub struct Guest<'a> {
    mem: GuestMemory<&'a mut Store<HostState>>,
    exports: &'a GuestExports,
}

impl<'a> Guest<'a> {
    pub fn new(store: &'a mut Store<HostState>, exports: &'a GuestExports) -> Self {
        Self {
            mem: GuestMemory::new(exports.memory, store),
            exports,
        }
    }

    /// The underlying store, for invoking other exports.
    pub fn store_mut(&mut self) -> &mut Store<HostState> {
        self.mem.context_mut()
    }
}

impl LinearMemory for Guest<'_> {
    fn size(&self) -> usize {
        self.mem.size()
    }

    fn read(&self, addr: u32, len: u32) -> Result<Vec<u8>, AbiError> {
        self.mem.read(addr, len)
    }

    fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<(), AbiError> {
        self.mem.write(addr, bytes)
    }
}

impl GuestAllocator for Guest<'_> {
    fn allocate(&mut self, size: u32) -> Result<u32, AbiError> {
        let requested = i32::try_from(size)
            .map_err(|_| AbiError::AllocationFailed(format!("size {} exceeds i32", size)))?;
        let exports = self.exports;
        let ptr = exports
            .allocate
            .call(self.store_mut(), requested)
            .map_err(|e| allocator_trap(format!("allocate({})", size), e))?;
        if ptr < 0 {
            return Err(AbiError::AllocationFailed(format!(
                "allocate({}) returned negative pointer {}",
                size, ptr
            )));
        }
        trace!(ptr, size, "guest allocate");
        Ok(ptr as u32)
    }

    fn deallocate(&mut self, ptr: u32, size: u32) -> Result<(), AbiError> {
        trace!(ptr, size, "guest deallocate");
        let exports = self.exports;
        exports
            .deallocate
            .call(self.store_mut(), (ptr as i32, size as i32))
            .map_err(|e| allocator_trap(format!("deallocate({}, {})", ptr, size), e))
    }
}

/// Fuel exhaustion keeps its identity; any other trap is an allocator failure.
fn allocator_trap(call: String, err: anyhow::Error) -> AbiError {
    if err.downcast_ref::<Trap>() == Some(&Trap::OutOfFuel) {
        AbiError::FuelExhausted(call)
    } else {
        AbiError::AllocationFailed(format!("{} trapped: {:#}", call, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_trap_out_of_fuel() {
        let err = allocator_trap("allocate(8)".into(), anyhow::Error::new(Trap::OutOfFuel));
        assert_eq!(err, AbiError::FuelExhausted("allocate(8)".into()));
    }

    #[test]
    fn test_allocator_trap_other() {
        let err = allocator_trap(
            "deallocate(16, 8)".into(),
            anyhow::Error::new(Trap::UnreachableCodeReached),
        );
        match err {
            AbiError::AllocationFailed(msg) => assert!(msg.contains("deallocate(16, 8)")),
            other => panic!("expected AllocationFailed, got: {:?}", other),
        }
    }
}
