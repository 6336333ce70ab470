//! # Codec
//!
//! The fixed table of primitive encodings and the bit-exact conversions between
//! memory bytes and [`Value`]s.
//!
//! ## Supported Kinds
//!
//! | `DW_AT_encoding`        | bytes | kind      |
//! |-------------------------|-------|-----------|
//! | `DW_ATE_boolean`        | 1     | `Bool`    |
//! | `DW_ATE_float`          | 4     | `Float32` |
//! | `DW_ATE_signed_char`    | 1     | `Int8`    |
//! | `DW_ATE_signed`         | 2     | `Int16`   |
//! | `DW_ATE_signed`         | 4     | `Int32`   |
//! | `DW_ATE_unsigned_char`  | 1     | `UInt8`   |
//! | `DW_ATE_unsigned`       | 2     | `UInt16`  |
//! | `DW_ATE_unsigned`       | 4     | `UInt32`  |
//!
//! All multi-byte values are little-endian. Any other `(encoding, width)` pair
//! is rejected when the type is resolved.

use std::fmt;

use gimli::{constants, DwAte};
use smallvec::SmallVec;

use crate::error::{SymvarError, SymvarResult};
use crate::types::Value;

/// Integers up to 2^24 convert to `f32` without rounding
const F32_EXACT_INT: u64 = 1 << 24;

/// Encoded bytes of one primitive (at most 4)
pub type Bytes = SmallVec<[u8; 4]>;

/// One row of the codec table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind
{
    Bool,
    Float32,
    Int8,
    Int16,
    Int32,
    UInt8,
    UInt16,
    UInt32,
}

impl PrimitiveKind
{
    /// Look up the kind for a base type's `(DW_AT_encoding, DW_AT_byte_size)`
    ///
    /// Returns `None` for pairs outside the table (e.g. 8-byte doubles).
    pub fn from_encoding(encoding: DwAte, byte_size: u64) -> Option<Self>
    {
        let kind = match (encoding, byte_size) {
            (constants::DW_ATE_boolean, 1) => PrimitiveKind::Bool,
            (constants::DW_ATE_float, 4) => PrimitiveKind::Float32,
            (constants::DW_ATE_signed_char, 1) => PrimitiveKind::Int8,
            (constants::DW_ATE_signed, 2) => PrimitiveKind::Int16,
            (constants::DW_ATE_signed, 4) => PrimitiveKind::Int32,
            (constants::DW_ATE_unsigned_char, 1) => PrimitiveKind::UInt8,
            (constants::DW_ATE_unsigned, 2) => PrimitiveKind::UInt16,
            (constants::DW_ATE_unsigned, 4) => PrimitiveKind::UInt32,
            _ => return None,
        };
        Some(kind)
    }

    /// Width of the kind in memory
    pub const fn byte_width(self) -> usize
    {
        match self {
            PrimitiveKind::Bool | PrimitiveKind::Int8 | PrimitiveKind::UInt8 => 1,
            PrimitiveKind::Int16 | PrimitiveKind::UInt16 => 2,
            PrimitiveKind::Float32 | PrimitiveKind::Int32 | PrimitiveKind::UInt32 => 4,
        }
    }

    /// Inclusive integer range, `None` for bool and float
    pub const fn int_range(self) -> Option<(i64, i64)>
    {
        match self {
            PrimitiveKind::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            PrimitiveKind::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            PrimitiveKind::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            PrimitiveKind::UInt8 => Some((0, u8::MAX as i64)),
            PrimitiveKind::UInt16 => Some((0, u16::MAX as i64)),
            PrimitiveKind::UInt32 => Some((0, u32::MAX as i64)),
            PrimitiveKind::Bool | PrimitiveKind::Float32 => None,
        }
    }

    /// Decode little-endian bytes
    ///
    /// Missing trailing bytes are treated as zero; extra bytes are ignored.
    pub fn decode(self, bytes: &[u8]) -> Value
    {
        match self {
            PrimitiveKind::Bool => Value::Bool(byte_at(bytes, 0) != 0),
            PrimitiveKind::Float32 => Value::Float(f32::from_le_bytes(le_array(bytes))),
            PrimitiveKind::Int8 => Value::Int(i64::from(byte_at(bytes, 0) as i8)),
            PrimitiveKind::Int16 => Value::Int(i64::from(i16::from_le_bytes(le_array(bytes)))),
            PrimitiveKind::Int32 => Value::Int(i64::from(i32::from_le_bytes(le_array(bytes)))),
            PrimitiveKind::UInt8 => Value::Int(i64::from(byte_at(bytes, 0))),
            PrimitiveKind::UInt16 => Value::Int(i64::from(u16::from_le_bytes(le_array(bytes)))),
            PrimitiveKind::UInt32 => Value::Int(i64::from(u32::from_le_bytes(le_array(bytes)))),
        }
    }

    /// Validate a value against this kind and encode it little-endian
    ///
    /// ## Errors
    ///
    /// - `WrongValueKind` for a float written to an integer or a bool
    /// - `ValueOutOfRange` for integers outside the kind's range (`0..=1` for bool)
    ///   and for non-finite floats
    pub fn encode(self, value: Value) -> SymvarResult<Bytes>
    {
        match (self, value) {
            (PrimitiveKind::Bool, Value::Bool(flag)) => Ok(Bytes::from_slice(&[u8::from(flag)])),
            (PrimitiveKind::Bool, Value::Int(raw @ (0 | 1))) => Ok(Bytes::from_slice(&[raw as u8])),
            (PrimitiveKind::Bool, Value::Int(_)) => Err(self.out_of_range(value)),
            (PrimitiveKind::Float32, Value::Float(float)) if float.is_finite() => {
                Ok(Bytes::from_slice(&float.to_le_bytes()))
            }
            (PrimitiveKind::Float32, Value::Float(_)) => Err(self.out_of_range(value)),
            (PrimitiveKind::Float32, Value::Int(int)) if int.unsigned_abs() <= F32_EXACT_INT => {
                Ok(Bytes::from_slice(&(int as f32).to_le_bytes()))
            }
            (PrimitiveKind::Float32, Value::Int(_)) => Err(self.out_of_range(value)),
            (_, Value::Int(int)) => match self.int_range() {
                Some((min, max)) if (min..=max).contains(&int) => {
                    Ok(Bytes::from_slice(&int.to_le_bytes()[..self.byte_width()]))
                }
                Some(_) => Err(self.out_of_range(value)),
                None => Err(self.wrong_kind(value)),
            },
            _ => Err(self.wrong_kind(value)),
        }
    }

    fn out_of_range(self, value: Value) -> SymvarError
    {
        SymvarError::ValueOutOfRange {
            value,
            target: self.to_string(),
        }
    }

    fn wrong_kind(self, value: Value) -> SymvarError
    {
        SymvarError::WrongValueKind {
            value,
            target: self.to_string(),
        }
    }
}

impl fmt::Display for PrimitiveKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let name = match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Float32 => "float32",
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::UInt8 => "uint8",
            PrimitiveKind::UInt16 => "uint16",
            PrimitiveKind::UInt32 => "uint32",
        };
        f.write_str(name)
    }
}

fn byte_at(bytes: &[u8], index: usize) -> u8
{
    bytes.get(index).copied().unwrap_or(0)
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N]
{
    std::array::from_fn(|i| byte_at(bytes, i))
}

/// A sub-byte field inside a single `unsigned char`
///
/// `offset` counts from the most significant bit, the way `DW_AT_bit_offset`
/// does. A 4-bit field at offset 0 is the high nibble:
///
/// ```rust
/// use symvar_core::codec::BitField;
///
/// let high = BitField::new(4, 0)?;
/// assert_eq!(high.mask(), 0xf0);
/// assert_eq!(high.insert(0x04, 0xf), 0xf4);
/// assert_eq!(high.extract(0xf4), 0xf);
/// # Ok::<(), symvar_core::error::SymvarError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField
{
    size: u8,
    offset: u8,
}

impl BitField
{
    /// ## Errors
    ///
    /// `UnsupportedType` unless `1 <= size` and `size + offset <= 8`.
    pub fn new(size: u8, offset: u8) -> SymvarResult<Self>
    {
        if size == 0 || u16::from(size) + u16::from(offset) > 8 {
            return Err(SymvarError::UnsupportedType(format!(
                "bit-field of {size} bits at offset {offset} does not fit in one byte"
            )));
        }
        Ok(Self { size, offset })
    }

    pub const fn size(self) -> u8
    {
        self.size
    }

    pub const fn offset(self) -> u8
    {
        self.offset
    }

    /// Right shift that moves the field down to bit 0
    pub const fn shift(self) -> u8
    {
        8 - self.offset - self.size
    }

    /// Largest value the field can hold
    pub const fn max_value(self) -> u8
    {
        ((1u16 << self.size) - 1) as u8
    }

    /// `((1 << size) - 1) << (8 - offset - size)`
    pub const fn mask(self) -> u8
    {
        self.max_value() << self.shift()
    }

    pub const fn extract(self, byte: u8) -> u8
    {
        (byte & self.mask()) >> self.shift()
    }

    /// Replace the field's bits in `byte`, leaving every other bit untouched
    pub const fn insert(self, byte: u8, field: u8) -> u8
    {
        (byte & !self.mask()) | ((field << self.shift()) & self.mask())
    }

    /// Range-check a value for this field
    ///
    /// Integers in `0..=max_value()` are accepted; so are bools for 1-bit fields.
    pub fn encode(self, value: Value) -> SymvarResult<u8>
    {
        let raw = match value {
            Value::Int(int) => int,
            Value::Bool(flag) if self.size == 1 => i64::from(flag),
            _ => {
                return Err(SymvarError::WrongValueKind {
                    value,
                    target: self.to_string(),
                })
            }
        };
        if (0..=i64::from(self.max_value())).contains(&raw) {
            Ok(raw as u8)
        } else {
            Err(SymvarError::ValueOutOfRange {
                value,
                target: self.to_string(),
            })
        }
    }
}

impl fmt::Display for BitField
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}-bit field", self.size)
    }
}
