//! Host values and their byte encoding.
//!
//! `HostValue` is the closed set of shapes a host can pass to, or receive
//! from, a guest export. Encoding is little-endian for every multi-byte
//! number. Arrays are the concatenation of their elements, strings are raw
//! UTF-8, booleans are a single `0`/`1` byte and runes are a 4-byte code
//! point.

use crate::error::AbiError;
use crate::tag::TypeTag;

/// A typed value crossing the guest boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Rune(char),
    Bytes(Vec<u8>),
    I8Array(Vec<i8>),
    U16Array(Vec<u16>),
    I16Array(Vec<i16>),
    U32Array(Vec<u32>),
    I32Array(Vec<i32>),
    U64Array(Vec<u64>),
    I64Array(Vec<i64>),
    String(String),
}

impl HostValue {
    /// The wire tag for this value's shape.
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::U8(_) => TypeTag::U8,
            Self::I8(_) => TypeTag::I8,
            Self::U16(_) => TypeTag::U16,
            Self::I16(_) => TypeTag::I16,
            Self::U32(_) => TypeTag::U32,
            Self::I32(_) => TypeTag::I32,
            Self::U64(_) => TypeTag::U64,
            Self::I64(_) => TypeTag::I64,
            Self::F32(_) => TypeTag::F32,
            Self::F64(_) => TypeTag::F64,
            Self::Bool(_) => TypeTag::Bool,
            Self::Rune(_) => TypeTag::Rune,
            Self::Bytes(_) => TypeTag::ByteArray,
            Self::I8Array(_) => TypeTag::I8Array,
            Self::U16Array(_) => TypeTag::U16Array,
            Self::I16Array(_) => TypeTag::I16Array,
            Self::U32Array(_) => TypeTag::U32Array,
            Self::I32Array(_) => TypeTag::I32Array,
            Self::U64Array(_) => TypeTag::U64Array,
            Self::I64Array(_) => TypeTag::I64Array,
            Self::String(_) => TypeTag::String,
        }
    }

    /// Length the guest expects in the argument descriptor.
    ///
    /// Element count for fixed-width-element arrays, byte count for byte
    /// arrays and strings, and 1 for every scalar. This is NOT the
    /// allocation size for multi-byte values; see [`wire_len`](Self::wire_len).
    pub fn logical_len(&self) -> usize {
        match self {
            Self::Bytes(v) => v.len(),
            Self::I8Array(v) => v.len(),
            Self::U16Array(v) => v.len(),
            Self::I16Array(v) => v.len(),
            Self::U32Array(v) => v.len(),
            Self::I32Array(v) => v.len(),
            Self::U64Array(v) => v.len(),
            Self::I64Array(v) => v.len(),
            Self::String(s) => s.len(),
            _ => 1,
        }
    }

    /// Number of bytes the encoded value occupies in guest memory.
    pub fn wire_len(&self) -> usize {
        if self.tag().is_sequence() {
            self.logical_len() * self.tag().element_width()
        } else {
            self.tag().element_width()
        }
    }

    /// Serialize into the wire representation.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::U8(v) => vec![*v],
            Self::I8(v) => v.to_le_bytes().to_vec(),
            Self::U16(v) => v.to_le_bytes().to_vec(),
            Self::I16(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::U64(v) => v.to_le_bytes().to_vec(),
            Self::I64(v) => v.to_le_bytes().to_vec(),
            Self::F32(v) => v.to_le_bytes().to_vec(),
            Self::F64(v) => v.to_le_bytes().to_vec(),
            Self::Bool(v) => vec![u8::from(*v)],
            Self::Rune(c) => u32::from(*c).to_le_bytes().to_vec(),
            Self::Bytes(v) => v.clone(),
            Self::I8Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::U16Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I16Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::U32Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I32Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::U64Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I64Array(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::String(s) => s.as_bytes().to_vec(),
        }
    }

    /// Reconstruct a value of shape `tag` from its wire bytes.
    ///
    /// Scalars must be exactly their encoded width and arrays a whole number
    /// of elements. Booleans are true only for byte `1`. Strings are decoded
    /// lossily: invalid UTF-8 is replaced, never rejected.
    pub fn decode(tag: TypeTag, bytes: &[u8]) -> Result<Self, AbiError> {
        let value = match tag {
            TypeTag::U8 => Self::U8(u8::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::I8 => Self::I8(i8::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::U16 => Self::U16(u16::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::I16 => Self::I16(i16::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::U32 => Self::U32(u32::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::I32 => Self::I32(i32::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::U64 => Self::U64(u64::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::I64 => Self::I64(i64::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::F32 => Self::F32(f32::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::F64 => Self::F64(f64::from_le_bytes(fixed(tag, bytes)?)),
            TypeTag::Bool => {
                let [b] = fixed::<1>(tag, bytes)?;
                Self::Bool(b == 1)
            }
            TypeTag::Rune => {
                let code = u32::from_le_bytes(fixed(tag, bytes)?);
                let c = char::from_u32(code).ok_or_else(|| {
                    AbiError::malformed(format!("0x{:X} is not a unicode scalar value", code))
                })?;
                Self::Rune(c)
            }
            TypeTag::ByteArray => Self::Bytes(bytes.to_vec()),
            TypeTag::I8Array => Self::I8Array(elements(tag, bytes, i8::from_le_bytes)?),
            TypeTag::U16Array => Self::U16Array(elements(tag, bytes, u16::from_le_bytes)?),
            TypeTag::I16Array => Self::I16Array(elements(tag, bytes, i16::from_le_bytes)?),
            TypeTag::U32Array => Self::U32Array(elements(tag, bytes, u32::from_le_bytes)?),
            TypeTag::I32Array => Self::I32Array(elements(tag, bytes, i32::from_le_bytes)?),
            TypeTag::U64Array => Self::U64Array(elements(tag, bytes, u64::from_le_bytes)?),
            TypeTag::I64Array => Self::I64Array(elements(tag, bytes, i64::from_le_bytes)?),
            TypeTag::String => Self::String(String::from_utf8_lossy(bytes).into_owned()),
        };
        Ok(value)
    }
}

/// Interpret `bytes` as exactly one `N`-byte scalar of shape `tag`.
fn fixed<const N: usize>(tag: TypeTag, bytes: &[u8]) -> Result<[u8; N], AbiError> {
    bytes.try_into().map_err(|_| {
        AbiError::malformed(format!(
            "{} expects {} bytes, got {}",
            tag,
            N,
            bytes.len()
        ))
    })
}

/// Split `bytes` into `N`-byte little-endian elements.
fn elements<T, const N: usize>(
    tag: TypeTag,
    bytes: &[u8],
    from_le: fn([u8; N]) -> T,
) -> Result<Vec<T>, AbiError> {
    if bytes.len() % N != 0 {
        return Err(AbiError::malformed(format!(
            "{} payload of {} bytes is not a multiple of {}",
            tag,
            bytes.len(),
            N
        )));
    }
    Ok(bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut buf = [0u8; N];
            buf.copy_from_slice(chunk);
            from_le(buf)
        })
        .collect())
}

macro_rules! host_value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl TryFrom<HostValue> for $ty {
                type Error = AbiError;

                fn try_from(value: HostValue) -> Result<Self, Self::Error> {
                    match value {
                        HostValue::$variant(v) => Ok(v),
                        other => Err(AbiError::malformed(format!(
                            "expected {}, found {}",
                            stringify!($variant),
                            other.tag()
                        ))),
                    }
                }
            }
        )*
    };
}

host_value_conversions! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    char => Rune,
    Vec<u8> => Bytes,
    Vec<i8> => I8Array,
    Vec<u16> => U16Array,
    Vec<i16> => I16Array,
    Vec<u32> => U32Array,
    Vec<i32> => I32Array,
    Vec<u64> => U64Array,
    Vec<i64> => I64Array,
    String => String,
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<&[u8]> for HostValue {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}
