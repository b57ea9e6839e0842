//! The closed set of fixed-width element types a descriptor may carry.

use crate::error::{ColumnError, Violation};

/// Logical element type of a column.
///
/// Raw codes follow the legacy cuDF `gdf_dtype` numbering. Code 0 (invalid)
/// and the variable-width codes (category, string) are not representable.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeId {
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Float32 = 5,
    Float64 = 6,
    /// One byte per value, zero is false.
    Bool8 = 7,
    /// Days since the epoch.
    Date32 = 8,
    /// Milliseconds since the epoch.
    Date64 = 9,
    /// Epoch-ms timestamp.
    Timestamp = 10,
}

impl TypeId {
    pub const ALL: [TypeId; 10] = [
        TypeId::Int8,
        TypeId::Int16,
        TypeId::Int32,
        TypeId::Int64,
        TypeId::Float32,
        TypeId::Float64,
        TypeId::Bool8,
        TypeId::Date32,
        TypeId::Date64,
        TypeId::Timestamp,
    ];

    /// Decode a raw type identifier received across the boundary.
    pub fn from_raw(raw: i32) -> Result<Self, ColumnError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_raw() == raw)
            .ok_or_else(|| Violation::UnknownTypeId(raw).into())
    }

    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// Byte width of one element.
    pub const fn byte_width(self) -> usize {
        match self {
            TypeId::Int8 | TypeId::Bool8 => 1,
            TypeId::Int16 => 2,
            TypeId::Int32 | TypeId::Float32 | TypeId::Date32 => 4,
            TypeId::Int64 | TypeId::Float64 | TypeId::Date64 | TypeId::Timestamp => 8,
        }
    }

    /// Numpy-style type string used by the array interface.
    pub const fn typestr(self) -> &'static str {
        match self {
            TypeId::Int8 => "|i1",
            TypeId::Bool8 => "|b1",
            TypeId::Int16 => "<i2",
            TypeId::Int32 | TypeId::Date32 => "<i4",
            TypeId::Int64 | TypeId::Date64 => "<i8",
            TypeId::Timestamp => "<M8[ms]",
            TypeId::Float32 => "<f4",
            TypeId::Float64 => "<f8",
        }
    }

    /// Inverse of [`TypeId::typestr`]. Date columns decode as plain integers
    /// since the type string does not distinguish them.
    pub fn from_typestr(typestr: &str) -> Option<Self> {
        match typestr {
            "|i1" | "<i1" => Some(TypeId::Int8),
            "|b1" | "<b1" => Some(TypeId::Bool8),
            "<i2" => Some(TypeId::Int16),
            "<i4" => Some(TypeId::Int32),
            "<i8" => Some(TypeId::Int64),
            "<f4" => Some(TypeId::Float32),
            "<f8" => Some(TypeId::Float64),
            "<M8[ms]" => Some(TypeId::Timestamp),
            _ => None,
        }
    }

    pub const fn is_floating(self) -> bool {
        matches!(self, TypeId::Float32 | TypeId::Float64)
    }
}

impl TryFrom<i32> for TypeId {
    type Error = ColumnError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl From<TypeId> for i32 {
    fn from(t: TypeId) -> i32 {
        t.as_raw()
    }
}

/// A Rust primitive that can be read out of (or written into) a column buffer.
pub trait NativeValue: Copy + Sized {
    /// Type identifier used when producing a column of this primitive.
    const TYPE_ID: TypeId;

    /// Whether a column of `type_id` may be read as `Self`.
    fn accepts(type_id: TypeId) -> bool {
        type_id == Self::TYPE_ID
    }

    /// Decode from exactly `TYPE_ID.byte_width()` little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    fn extend_le(self, out: &mut Vec<u8>);
}

macro_rules! native_value {
    ($ty:ty, $type_id:expr $(, $alias:pat)?) => {
        impl NativeValue for $ty {
            const TYPE_ID: TypeId = $type_id;

            fn accepts(type_id: TypeId) -> bool {
                type_id == $type_id $(|| matches!(type_id, $alias))?
            }

            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_le_bytes(buf)
            }

            fn extend_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

native_value!(i8, TypeId::Int8);
native_value!(i16, TypeId::Int16);
native_value!(i32, TypeId::Int32, TypeId::Date32);
native_value!(i64, TypeId::Int64, TypeId::Date64 | TypeId::Timestamp);
native_value!(f32, TypeId::Float32);
native_value!(f64, TypeId::Float64);

impl NativeValue for bool {
    const TYPE_ID: TypeId = TypeId::Bool8;

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn extend_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn raw_codes_round_trip() {
        for t in TypeId::ALL {
            assert_eq!(TypeId::from_raw(t.as_raw()).unwrap(), t);
        }
    }

    #[test]
    fn invalid_and_variable_width_codes_rejected() {
        for raw in [0, 11, 12, 13, -1] {
            let err = TypeId::try_from(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ContractViolation);
        }
    }

    #[test]
    fn byte_widths() {
        assert_eq!(TypeId::Int8.byte_width(), 1);
        assert_eq!(TypeId::Bool8.byte_width(), 1);
        assert_eq!(TypeId::Int16.byte_width(), 2);
        assert_eq!(TypeId::Int32.byte_width(), 4);
        assert_eq!(TypeId::Date32.byte_width(), 4);
        assert_eq!(TypeId::Float32.byte_width(), 4);
        assert_eq!(TypeId::Timestamp.byte_width(), 8);
        assert_eq!(TypeId::Float64.byte_width(), 8);
    }

    #[test]
    fn typestr_matches_width() {
        for t in TypeId::ALL {
            let digits: String = t.typestr()[2..].chars().take_while(char::is_ascii_digit).collect();
            let width: usize = digits.parse().unwrap();
            assert_eq!(width, t.byte_width());
        }
        assert_eq!(TypeId::from_typestr("<f4"), Some(TypeId::Float32));
        assert_eq!(TypeId::from_typestr("<i4"), Some(TypeId::Int32));
        assert_eq!(TypeId::from_typestr("<U8"), None);
        assert_eq!(TypeId::from_typestr(TypeId::Timestamp.typestr()), Some(TypeId::Timestamp));
        assert_eq!(TypeId::from_typestr("<M8[ns]"), None);
    }

    #[test]
    fn native_value_accepts_aliases() {
        assert!(i32::accepts(TypeId::Date32));
        assert!(i64::accepts(TypeId::Timestamp));
        assert!(!i64::accepts(TypeId::Int32));
        assert!(!f32::accepts(TypeId::Int32));
        assert_eq!(i16::from_le_slice(&[0x34, 0x12]), 0x1234);
        assert!(bool::from_le_slice(&[2]));
    }
}
