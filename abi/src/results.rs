//! Result payload decoding.
//!
//! Both result protocols end up here: the synchronous protocol reads a
//! [`ResultDescriptor`] first, the callback protocol receives the
//! `(pointer, count)` or `(pointer, length)` pair directly from the guest.
//! Values are copied out of guest memory, so decoded results stay valid
//! after the guest reuses its buffers.

use crate::error::AbiError;
use crate::layout::{ResultDescriptor, ResultEntry, RESULT_DESCRIPTOR_SIZE, RESULT_ENTRY_SIZE};
use crate::tag::TypeTag;
use crate::traits::LinearMemory;
use crate::value::HostValue;

/// What to do with a result entry whose tag is outside the closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTagPolicy {
    /// Fail the whole decode with [`AbiError::UnknownTag`].
    #[default]
    Reject,
    /// Drop the entry and keep decoding, yielding a shorter result list.
    Skip,
}

/// A decoded guest response.
#[derive(Debug, Clone, PartialEq)]
pub enum GuestResponse {
    /// The export succeeded and returned these values, in order.
    Values(Vec<HostValue>),
    /// The export reported a business-logic error.
    Error(String),
}

/// Read the 9-byte result descriptor at `ptr`.
pub fn read_result_descriptor<M>(mem: &M, ptr: u32) -> Result<ResultDescriptor, AbiError>
where
    M: LinearMemory + ?Sized,
{
    let bytes = mem.read(ptr, RESULT_DESCRIPTOR_SIZE as u32)?;
    ResultDescriptor::from_bytes(&bytes)
}

/// Decode the response whose descriptor lives at `descriptor_ptr`.
pub fn read_response<M>(
    mem: &M,
    descriptor_ptr: u32,
    policy: UnknownTagPolicy,
) -> Result<GuestResponse, AbiError>
where
    M: LinearMemory + ?Sized,
{
    let descriptor = read_result_descriptor(mem, descriptor_ptr)?;
    if descriptor.is_success() {
        decode_results(mem, descriptor.ptr, descriptor.len, policy).map(GuestResponse::Values)
    } else {
        read_error_message(mem, descriptor.ptr, descriptor.len).map(GuestResponse::Error)
    }
}

/// Read `count` result entries starting at `ptr` and decode each value.
pub fn decode_results<M>(
    mem: &M,
    ptr: u32,
    count: u32,
    policy: UnknownTagPolicy,
) -> Result<Vec<HostValue>, AbiError>
where
    M: LinearMemory + ?Sized,
{
    let block_len = count
        .checked_mul(RESULT_ENTRY_SIZE as u32)
        .ok_or_else(|| AbiError::out_of_bounds(ptr, u32::MAX, mem.size()))?;
    let block = mem.read(ptr, block_len)?;
    let entries = ResultEntry::parse_all(&block, count as usize)?;

    let mut values = Vec::with_capacity(entries.len());
    for entry in entries {
        match decode_entry(mem, &entry) {
            Ok(value) => values.push(value),
            Err(AbiError::UnknownTag(_)) if policy == UnknownTagPolicy::Skip => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(values)
}

/// Decode the value a single result entry points at.
pub fn decode_entry<M>(mem: &M, entry: &ResultEntry) -> Result<HostValue, AbiError>
where
    M: LinearMemory + ?Sized,
{
    let tag = TypeTag::from_i32(entry.tag).ok_or(AbiError::UnknownTag(entry.tag))?;
    let bytes = mem.read(entry.ptr, entry.byte_len)?;
    HostValue::decode(tag, &bytes)
}

/// Read an error payload as a message. Invalid UTF-8 is replaced, not rejected.
pub fn read_error_message<M>(mem: &M, ptr: u32, len: u32) -> Result<String, AbiError>
where
    M: LinearMemory + ?Sized,
{
    let bytes = mem.read(ptr, len)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
