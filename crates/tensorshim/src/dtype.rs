use std::fmt;

use thiserror::Error;

/// Element types understood by the engine.
///
/// The discriminants are the engine's wire codes and must not be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum DataType {
    /// 32-bit IEEE float.
    Float = 1,
    /// 64-bit IEEE float.
    Double = 2,
    /// 32-bit signed integer.
    Int32 = 3,
    /// 8-bit unsigned integer.
    UInt8 = 4,
    /// 16-bit signed integer.
    Int16 = 5,
    /// 8-bit signed integer.
    Int8 = 6,
    /// Variable-length byte string, stored as one record per element.
    String = 7,
    /// 64-bit signed integer.
    Int64 = 9,
    /// Boolean stored as one byte.
    Bool = 10,
    /// Brain floating point, 16 bits.
    BFloat16 = 14,
    /// 16-bit unsigned integer.
    UInt16 = 17,
    /// 32-bit unsigned integer.
    UInt32 = 22,
    /// 64-bit unsigned integer.
    UInt64 = 23,
}

/// Error returned when a raw code does not name a known [`DataType`].
#[derive(Debug, Error, PartialEq)]
#[error("Unknown data type code {0}")]
pub struct UnknownDataType(pub i32);

impl DataType {
    /// Every data type, in wire-code order.
    pub const ALL: [DataType; 13] = [
        DataType::Float,
        DataType::Double,
        DataType::Int32,
        DataType::UInt8,
        DataType::Int16,
        DataType::Int8,
        DataType::String,
        DataType::Int64,
        DataType::Bool,
        DataType::BFloat16,
        DataType::UInt16,
        DataType::UInt32,
        DataType::UInt64,
    ];

    /// Returns the wire code of the data type.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Returns the size in bytes of one element, or `None` for variable-length types.
    pub fn size(self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Int8 | DataType::UInt8 => Some(1),
            DataType::Int16 | DataType::UInt16 | DataType::BFloat16 => Some(2),
            DataType::Int32 | DataType::UInt32 | DataType::Float => Some(4),
            DataType::Int64 | DataType::UInt64 | DataType::Double => Some(8),
            DataType::String => None,
        }
    }

    /// Returns true if elements are fixed-size and copied byte for byte.
    #[inline]
    pub fn is_numeric(self) -> bool {
        self.size().is_some()
    }
}

impl TryFrom<i32> for DataType {
    type Error = UnknownDataType;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        DataType::ALL
            .into_iter()
            .find(|dtype| dtype.code() == code)
            .ok_or(UnknownDataType(code))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Bool => "Bool",
            DataType::Int8 => "Int8",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::UInt8 => "UInt8",
            DataType::UInt16 => "UInt16",
            DataType::UInt32 => "UInt32",
            DataType::UInt64 => "UInt64",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::BFloat16 => "BFloat16",
            DataType::String => "String",
        };
        f.write_str(name)
    }
}

mod private {
    pub trait Sealed {}
}

/// Rust primitives that map one-to-one onto a numeric [`DataType`].
pub trait TensorScalar: private::Sealed + Copy + 'static {
    /// The engine data type for this scalar.
    const DATA_TYPE: DataType;

    /// Native-endian byte representation.
    type Bytes: AsRef<[u8]>;

    /// Returns the native-endian bytes of the value.
    fn to_ne_bytes(self) -> Self::Bytes;

    /// Decodes a value from exactly `size_of::<Self>()` native-endian bytes.
    fn from_ne_slice(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_tensor_scalar {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl private::Sealed for $ty {}
            impl TensorScalar for $ty {
                const DATA_TYPE: DataType = DataType::$dtype;
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                #[inline]
                fn to_ne_bytes(self) -> Self::Bytes {
                    <$ty>::to_ne_bytes(self)
                }

                #[inline]
                fn from_ne_slice(bytes: &[u8]) -> Option<Self> {
                    bytes.try_into().ok().map(<$ty>::from_ne_bytes)
                }
            }
        )*
    };
}

impl_tensor_scalar! {
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float,
    f64 => Double,
}

impl private::Sealed for bool {}
impl TensorScalar for bool {
    const DATA_TYPE: DataType = DataType::Bool;
    type Bytes = [u8; 1];

    #[inline]
    fn to_ne_bytes(self) -> Self::Bytes {
        [self as u8]
    }

    // any non-zero byte reads back as true
    #[inline]
    fn from_ne_slice(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b] => Some(*b != 0),
            _ => None,
        }
    }
}
