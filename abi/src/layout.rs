//! Fixed-layout wire records exchanged through guest memory.
//!
//! All fields are little-endian `u32`/`i32` except the one-byte result
//! flag:
//!
//! ```text
//! ArgDescriptor    [ptr: 4][len: 4]                 8 bytes, one per argument
//! ResultDescriptor [flag: 1][ptr: 4][len: 4]        9 bytes, flag 0 = success
//! ResultEntry      [ptr: 4][tag: 4][byte_len: 4]   12 bytes, one per result
//! ```

use crate::error::AbiError;

/// Width of a guest pointer or length field.
pub const POINTER_WIDTH: usize = 4;

/// Size of one argument-table slot.
pub const ARG_DESCRIPTOR_SIZE: usize = 2 * POINTER_WIDTH;

/// Size of the synchronous result header.
pub const RESULT_DESCRIPTOR_SIZE: usize = 1 + 2 * POINTER_WIDTH;

/// Size of one result entry.
pub const RESULT_ENTRY_SIZE: usize = 3 * POINTER_WIDTH;

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn le_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn check_len(record: &str, bytes: &[u8], expected: usize) -> Result<(), AbiError> {
    if bytes.len() != expected {
        return Err(AbiError::malformed(format!(
            "{} must be {} bytes, got {}",
            record,
            expected,
            bytes.len()
        )));
    }
    Ok(())
}

/// One `(pointer, logical length)` slot of the argument table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgDescriptor {
    pub ptr: u32,
    pub len: u32,
}

impl ArgDescriptor {
    pub fn to_bytes(self) -> [u8; ARG_DESCRIPTOR_SIZE] {
        let mut out = [0u8; ARG_DESCRIPTOR_SIZE];
        out[..4].copy_from_slice(&self.ptr.to_le_bytes());
        out[4..].copy_from_slice(&self.len.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AbiError> {
        check_len("argument descriptor", bytes, ARG_DESCRIPTOR_SIZE)?;
        Ok(Self {
            ptr: le_u32(bytes, 0),
            len: le_u32(bytes, 4),
        })
    }

    /// Byte offset of slot `index` within the table.
    pub fn offset(index: usize) -> usize {
        index * ARG_DESCRIPTOR_SIZE
    }
}

/// Header returned by a synchronous-protocol export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultDescriptor {
    /// `0` on success, anything else marks an error payload.
    pub flag: u8,
    /// Address of the result entries or of the error message.
    pub ptr: u32,
    /// Entry count on success, message byte length on error.
    pub len: u32,
}

impl ResultDescriptor {
    pub fn is_success(&self) -> bool {
        self.flag == 0
    }

    pub fn to_bytes(self) -> [u8; RESULT_DESCRIPTOR_SIZE] {
        let mut out = [0u8; RESULT_DESCRIPTOR_SIZE];
        out[0] = self.flag;
        out[1..5].copy_from_slice(&self.ptr.to_le_bytes());
        out[5..9].copy_from_slice(&self.len.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AbiError> {
        check_len("result descriptor", bytes, RESULT_DESCRIPTOR_SIZE)?;
        Ok(Self {
            flag: bytes[0],
            ptr: le_u32(bytes, 1),
            len: le_u32(bytes, 5),
        })
    }
}

/// Location and shape of one returned value.
///
/// The tag is kept raw so unknown codes can be reported (or skipped) by the
/// caller rather than lost at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultEntry {
    pub ptr: u32,
    pub tag: i32,
    /// Payload size in bytes (not elements).
    pub byte_len: u32,
}

impl ResultEntry {
    pub fn to_bytes(self) -> [u8; RESULT_ENTRY_SIZE] {
        let mut out = [0u8; RESULT_ENTRY_SIZE];
        out[..4].copy_from_slice(&self.ptr.to_le_bytes());
        out[4..8].copy_from_slice(&self.tag.to_le_bytes());
        out[8..].copy_from_slice(&self.byte_len.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AbiError> {
        check_len("result entry", bytes, RESULT_ENTRY_SIZE)?;
        Ok(Self {
            ptr: le_u32(bytes, 0),
            tag: le_i32(bytes, 4),
            byte_len: le_u32(bytes, 8),
        })
    }

    /// Parse `count` consecutive entries.
    pub fn parse_all(bytes: &[u8], count: usize) -> Result<Vec<Self>, AbiError> {
        let expected = count
            .checked_mul(RESULT_ENTRY_SIZE)
            .ok_or_else(|| AbiError::malformed(format!("{} result entries overflow", count)))?;
        check_len("result entry block", bytes, expected)?;
        bytes
            .chunks_exact(RESULT_ENTRY_SIZE)
            .map(Self::from_bytes)
            .collect()
    }
}
