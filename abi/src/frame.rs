//! Per-call argument frame.
//!
//! An `ArgumentFrame` owns the release list for one invocation. It allocates
//! the indirect argument table, encodes each argument into its own guest
//! buffer, and writes the `(pointer, logical length)` descriptor into the
//! argument's table slot. Every allocation is recorded the moment it
//! succeeds, so [`release`](ArgumentFrame::release) frees exactly what was
//! obtained even when population stopped partway through the list.

use crate::error::AbiError;
use crate::layout::{ArgDescriptor, ARG_DESCRIPTOR_SIZE};
use crate::traits::{GuestAllocator, LinearMemory};
use crate::value::HostValue;

/// A guest-memory lease obtained from the guest allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub ptr: u32,
    pub size: u32,
}

/// A release that the guest refused. Cleanup is best-effort: these are
/// reported to the caller for logging and never change the call outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFailure {
    pub allocation: Allocation,
    pub error: AbiError,
}

/// Largest size or length representable in the guest's `i32` ABI.
const MAX_ABI_LEN: usize = i32::MAX as usize;

/// Convert a host-side size into an ABI length.
///
/// Values whose size cannot be expressed as a non-negative `i32` have no
/// encoding and are rejected as unsupported.
pub fn abi_len(what: &str, len: usize) -> Result<u32, AbiError> {
    if len > MAX_ABI_LEN {
        return Err(AbiError::UnsupportedArgumentType(format!(
            "{} of {} bytes exceeds the 32-bit guest ABI",
            what, len
        )));
    }
    Ok(len as u32)
}

/// Release list and argument table for a single invocation.
#[derive(Debug, Default)]
pub struct ArgumentFrame {
    table: Option<Allocation>,
    arguments: Vec<Allocation>,
    descriptors: Vec<ArgDescriptor>,
}

impl ArgumentFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the table and encode `args` into it, in call order.
    ///
    /// Returns the table address to pass to the export. On error the frame
    /// still holds every allocation made so far; the caller must
    /// [`release`](Self::release) it on every path.
    pub fn populate<G>(&mut self, guest: &mut G, args: &[HostValue]) -> Result<u32, AbiError>
    where
        G: LinearMemory + GuestAllocator + ?Sized,
    {
        let table_size = abi_len(
            "argument table",
            args.len().saturating_mul(ARG_DESCRIPTOR_SIZE),
        )?;
        let table_ptr = guest.allocate(table_size)?;
        self.table = Some(Allocation {
            ptr: table_ptr,
            size: table_size,
        });

        for (index, value) in args.iter().enumerate() {
            let descriptor = self.encode_argument(guest, value)?;
            let slot = table_ptr as usize + ArgDescriptor::offset(index);
            guest.write(slot as u32, &descriptor.to_bytes())?;
            self.descriptors.push(descriptor);
        }

        Ok(table_ptr)
    }

    /// Encode one value into a fresh guest buffer.
    ///
    /// The returned descriptor carries the logical length the guest expects,
    /// which differs from the allocation size for multi-byte arrays.
    pub fn encode_argument<G>(
        &mut self,
        guest: &mut G,
        value: &HostValue,
    ) -> Result<ArgDescriptor, AbiError>
    where
        G: LinearMemory + GuestAllocator + ?Sized,
    {
        let size = abi_len(&value.tag().to_string(), value.wire_len())?;
        let len = abi_len(&value.tag().to_string(), value.logical_len())?;
        let bytes = value.encode();

        let ptr = guest.allocate(size)?;
        self.arguments.push(Allocation { ptr, size });
        guest.write(ptr, &bytes)?;

        Ok(ArgDescriptor { ptr, len })
    }

    /// Address of the argument table, once allocated.
    pub fn table(&self) -> Option<Allocation> {
        self.table
    }

    /// Descriptors written so far, in argument order.
    pub fn descriptors(&self) -> &[ArgDescriptor] {
        &self.descriptors
    }

    /// Number of outstanding allocations (table included).
    pub fn allocation_count(&self) -> usize {
        self.arguments.len() + usize::from(self.table.is_some())
    }

    /// Release every outstanding allocation.
    ///
    /// Attempts every release even if some fail; failures are returned for
    /// logging. Leaves the frame empty, so a second call is a no-op.
    pub fn release<G>(&mut self, guest: &mut G) -> Vec<ReleaseFailure>
    where
        G: GuestAllocator + ?Sized,
    {
        let mut failures = Vec::new();
        let pending = self.arguments.drain(..).chain(self.table.take());
        for allocation in pending {
            if let Err(error) = guest.deallocate(allocation.ptr, allocation.size) {
                failures.push(ReleaseFailure { allocation, error });
            }
        }
        self.descriptors.clear();
        failures
    }
}
