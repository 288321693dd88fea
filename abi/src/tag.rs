//! Type tag registry.
//!
//! Every value crossing the guest boundary is identified by a stable `i32`
//! code. These repr values are a wire contract shared with the guest-side
//! encoder and MUST NOT change; there is no version negotiation.

use core::fmt;

/// Closed set of value shapes understood on both sides of the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TypeTag {
    U8 = 1,
    I8 = 2,
    U16 = 3,
    I16 = 4,
    U32 = 5,
    I32 = 6,
    U64 = 7,
    I64 = 8,
    F32 = 9,
    F64 = 10,
    Bool = 11,
    Rune = 12,
    ByteArray = 21,
    I8Array = 22,
    U16Array = 23,
    I16Array = 24,
    U32Array = 25,
    I32Array = 26,
    U64Array = 27,
    I64Array = 28,
    String = 31,
}

impl TypeTag {
    /// All tags, in wire-code order.
    pub const ALL: [TypeTag; 21] = [
        Self::U8,
        Self::I8,
        Self::U16,
        Self::I16,
        Self::U32,
        Self::I32,
        Self::U64,
        Self::I64,
        Self::F32,
        Self::F64,
        Self::Bool,
        Self::Rune,
        Self::ByteArray,
        Self::I8Array,
        Self::U16Array,
        Self::I16Array,
        Self::U32Array,
        Self::I32Array,
        Self::U64Array,
        Self::I64Array,
        Self::String,
    ];

    /// Convert from a wire code. Returns `None` outside the closed set.
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::U8),
            2 => Some(Self::I8),
            3 => Some(Self::U16),
            4 => Some(Self::I16),
            5 => Some(Self::U32),
            6 => Some(Self::I32),
            7 => Some(Self::U64),
            8 => Some(Self::I64),
            9 => Some(Self::F32),
            10 => Some(Self::F64),
            11 => Some(Self::Bool),
            12 => Some(Self::Rune),
            21 => Some(Self::ByteArray),
            22 => Some(Self::I8Array),
            23 => Some(Self::U16Array),
            24 => Some(Self::I16Array),
            25 => Some(Self::U32Array),
            26 => Some(Self::I32Array),
            27 => Some(Self::U64Array),
            28 => Some(Self::I64Array),
            31 => Some(Self::String),
            _ => None,
        }
    }

    /// Return the wire code of this tag.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Width in bytes of one element.
    ///
    /// For scalars this is the full encoded width; for arrays and strings it
    /// is the width of a single element (strings count UTF-8 bytes).
    pub fn element_width(self) -> usize {
        match self {
            Self::U8 | Self::I8 | Self::Bool => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 | Self::Rune => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
            Self::ByteArray | Self::I8Array | Self::String => 1,
            Self::U16Array | Self::I16Array => 2,
            Self::U32Array | Self::I32Array => 4,
            Self::U64Array | Self::I64Array => 8,
        }
    }

    /// Returns true for variable-length shapes (arrays and strings).
    pub fn is_sequence(self) -> bool {
        self.as_i32() > 20
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Rune => "rune",
            Self::ByteArray => "[u8]",
            Self::I8Array => "[i8]",
            Self::U16Array => "[u16]",
            Self::I16Array => "[i16]",
            Self::U32Array => "[u32]",
            Self::I32Array => "[i32]",
            Self::U64Array => "[u64]",
            Self::I64Array => "[i64]",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        let cases: &[(TypeTag, i32)] = &[
            (TypeTag::U8, 1),
            (TypeTag::I8, 2),
            (TypeTag::U16, 3),
            (TypeTag::I16, 4),
            (TypeTag::U32, 5),
            (TypeTag::I32, 6),
            (TypeTag::U64, 7),
            (TypeTag::I64, 8),
            (TypeTag::F32, 9),
            (TypeTag::F64, 10),
            (TypeTag::Bool, 11),
            (TypeTag::Rune, 12),
            (TypeTag::ByteArray, 21),
            (TypeTag::I8Array, 22),
            (TypeTag::U16Array, 23),
            (TypeTag::I16Array, 24),
            (TypeTag::U32Array, 25),
            (TypeTag::I32Array, 26),
            (TypeTag::U64Array, 27),
            (TypeTag::I64Array, 28),
            (TypeTag::String, 31),
        ];
        for &(tag, code) in cases {
            assert_eq!(tag.as_i32(), code);
            assert_eq!(TypeTag::from_i32(code), Some(tag));
        }
    }

    #[test]
    fn test_unknown_codes_rejected() {
        for code in [0, 13, 20, 29, 30, 32, -1, i32::MAX] {
            assert_eq!(TypeTag::from_i32(code), None, "code {}", code);
        }
    }

    #[test]
    fn test_all_is_complete() {
        let known = (-1..=64).filter_map(TypeTag::from_i32).count();
        assert_eq!(known, TypeTag::ALL.len());
    }

    #[test]
    fn test_element_width() {
        assert_eq!(TypeTag::Bool.element_width(), 1);
        assert_eq!(TypeTag::Rune.element_width(), 4);
        assert_eq!(TypeTag::F64.element_width(), 8);
        assert_eq!(TypeTag::String.element_width(), 1);
        assert_eq!(TypeTag::U16Array.element_width(), 2);
        assert_eq!(TypeTag::I64Array.element_width(), 8);
    }

    #[test]
    fn test_is_sequence() {
        assert!(!TypeTag::Rune.is_sequence());
        assert!(!TypeTag::F64.is_sequence());
        assert!(TypeTag::ByteArray.is_sequence());
        assert!(TypeTag::String.is_sequence());
    }
}
