// crates/fleetcan-od/src/od/value.rs

use alloc::{string::String, vec::Vec};
use core::fmt;

/// The declared data type of an Object Dictionary entry.
///
/// This is a closed set; every consumer matches exhaustively so adding a
/// type is a compile-time event, never a silent fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    /// Printable string, variable length.
    VisibleString,
    /// Raw byte string, variable length.
    OctetString,
    /// Opaque binary blob, variable length.
    Domain,
}

impl DataType {
    /// Size of the type on the wire in bits. Variable-length types report 0;
    /// a boolean occupies a full byte in a PDO frame.
    pub fn bit_size(&self) -> u8 {
        match self {
            DataType::Bool | DataType::Int8 | DataType::Uint8 => 8,
            DataType::Int16 | DataType::Uint16 => 16,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 32,
            DataType::Int64 | DataType::Uint64 | DataType::Float64 => 64,
            DataType::VisibleString | DataType::OctetString | DataType::Domain => 0,
        }
    }

    /// The natural numeric range of the type, used when a config declares
    /// no explicit limits. `None` for types that carry no numeric limits.
    pub fn natural_range(&self) -> Option<(i128, i128)> {
        match self {
            DataType::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            DataType::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            DataType::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            DataType::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            DataType::Uint8 => Some((0, u8::MAX as i128)),
            DataType::Uint16 => Some((0, u16::MAX as i128)),
            DataType::Uint32 => Some((0, u32::MAX as i128)),
            DataType::Uint64 => Some((0, u64::MAX as i128)),
            DataType::Bool
            | DataType::Float32
            | DataType::Float64
            | DataType::VisibleString
            | DataType::OctetString
            | DataType::Domain => None,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            DataType::Uint8 | DataType::Uint16 | DataType::Uint32 | DataType::Uint64
        )
    }

    /// Variable-length types cannot be mapped into a PDO frame and carry
    /// no numeric limits.
    pub fn is_variable_length(&self) -> bool {
        matches!(
            self,
            DataType::VisibleString | DataType::OctetString | DataType::Domain
        )
    }

    /// The canonical zero value for the type.
    pub fn zero(&self) -> Value {
        match self {
            DataType::Bool => Value::Boolean(false),
            DataType::Int8 => Value::Integer8(0),
            DataType::Int16 => Value::Integer16(0),
            DataType::Int32 => Value::Integer32(0),
            DataType::Int64 => Value::Integer64(0),
            DataType::Uint8 => Value::Unsigned8(0),
            DataType::Uint16 => Value::Unsigned16(0),
            DataType::Uint32 => Value::Unsigned32(0),
            DataType::Uint64 => Value::Unsigned64(0),
            DataType::Float32 => Value::Real32(0.0),
            DataType::Float64 => Value::Real64(0.0),
            DataType::VisibleString => Value::VisibleString(String::new()),
            DataType::OctetString => Value::OctetString(Vec::new()),
            DataType::Domain => Value::Domain(Vec::new()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Bool => "bool",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::VisibleString => "str",
            DataType::OctetString => "octet_str",
            DataType::Domain => "domain",
        };
        f.write_str(name)
    }
}

/// Represents any value that can be stored in an Object Dictionary entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer8(i8),
    Integer16(i16),
    Integer32(i32),
    Integer64(i64),
    Unsigned8(u8),
    Unsigned16(u16),
    Unsigned32(u32),
    Unsigned64(u64),
    Real32(f32),
    Real64(f64),
    VisibleString(String),
    OctetString(Vec<u8>),
    Domain(Vec<u8>),
}

impl Value {
    /// The data type this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Bool,
            Value::Integer8(_) => DataType::Int8,
            Value::Integer16(_) => DataType::Int16,
            Value::Integer32(_) => DataType::Int32,
            Value::Integer64(_) => DataType::Int64,
            Value::Unsigned8(_) => DataType::Uint8,
            Value::Unsigned16(_) => DataType::Uint16,
            Value::Unsigned32(_) => DataType::Uint32,
            Value::Unsigned64(_) => DataType::Uint64,
            Value::Real32(_) => DataType::Float32,
            Value::Real64(_) => DataType::Float64,
            Value::VisibleString(_) => DataType::VisibleString,
            Value::OctetString(_) => DataType::OctetString,
            Value::Domain(_) => DataType::Domain,
        }
    }

    /// Widens any integer value (including booleans) to `i128` for limit
    /// checks. `None` for floats and variable-length types.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Boolean(v) => Some(*v as i128),
            Value::Integer8(v) => Some(*v as i128),
            Value::Integer16(v) => Some(*v as i128),
            Value::Integer32(v) => Some(*v as i128),
            Value::Integer64(v) => Some(*v as i128),
            Value::Unsigned8(v) => Some(*v as i128),
            Value::Unsigned16(v) => Some(*v as i128),
            Value::Unsigned32(v) => Some(*v as i128),
            Value::Unsigned64(v) => Some(*v as i128),
            Value::Real32(_)
            | Value::Real64(_)
            | Value::VisibleString(_)
            | Value::OctetString(_)
            | Value::Domain(_) => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        if let Value::Unsigned32(v) = self {
            Some(*v)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_bit_sizes() {
        assert_eq!(DataType::Bool.bit_size(), 8);
        assert_eq!(DataType::Uint16.bit_size(), 16);
        assert_eq!(DataType::Float64.bit_size(), 64);
        assert_eq!(DataType::OctetString.bit_size(), 0);
        assert_eq!(DataType::Domain.bit_size(), 0);
    }

    #[test]
    fn test_natural_ranges() {
        assert_eq!(DataType::Uint8.natural_range(), Some((0, 255)));
        assert_eq!(DataType::Int8.natural_range(), Some((-128, 127)));
        assert_eq!(
            DataType::Uint64.natural_range(),
            Some((0, u64::MAX as i128))
        );
        assert_eq!(DataType::VisibleString.natural_range(), None);
        assert_eq!(DataType::Float32.natural_range(), None);
    }

    #[test]
    fn test_zero_values_match_their_type() {
        for dt in [
            DataType::Bool,
            DataType::Int32,
            DataType::Uint64,
            DataType::Float64,
            DataType::VisibleString,
            DataType::Domain,
        ] {
            assert_eq!(dt.zero().data_type(), dt);
        }
    }

    #[test]
    fn test_as_int_widening() {
        assert_eq!(Value::Unsigned64(u64::MAX).as_int(), Some(u64::MAX as i128));
        assert_eq!(Value::Integer8(-1).as_int(), Some(-1));
        assert_eq!(Value::Boolean(true).as_int(), Some(1));
        assert_eq!(Value::Real32(1.0).as_int(), None);
        assert_eq!(Value::OctetString(vec![0]).as_int(), None);
    }
}
