//! PackStream serialization format.
//!
//! PackStream is the binary serialization format used by the Bolt protocol
//! to encode values for transmission between client and server.
//!
//! # Supported Types
//!
//! - **Null**: Single byte marker
//! - **Boolean**: True/False markers
//! - **Integer**: Variable-length encoding (-2^63 to 2^63-1)
//! - **Float**: 64-bit IEEE 754
//! - **String**: UTF-8 encoded, variable length prefix
//! - **List**: Heterogeneous collections
//! - **Map**: String keys to arbitrary values, insertion ordered
//! - **Structure**: Signature byte plus fields (messages, graph entities)
//!
//! Encoding is canonical: every value takes the smallest tier that fits.
//! Decoding is lenient and accepts any valid tier.

pub mod decoder;
pub mod encoder;
pub mod map;
pub mod marker;
pub mod types;

pub use decoder::{decode, decode_exact, PackStreamDecoder, MAX_NESTING_DEPTH};
pub use encoder::{encode, PackStreamEncoder};
pub use map::PackStreamMap;
pub use types::{PackStreamStructure, PackStreamValue};

use std::fmt;

/// PackStream errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PackStreamError {
    /// Unexpected end of input
    UnexpectedEof,
    /// Unknown marker byte
    UnknownMarker(u8),
    /// Invalid UTF-8 in string
    InvalidUtf8(String),
    /// Invalid map key (must be string)
    InvalidMapKey,
    /// Value too large to encode
    ValueTooLarge(&'static str, usize),
    /// Invalid structure format
    InvalidStructure(String),
    /// Bytes left over after a complete value
    TrailingBytes(usize),
    /// Containers nested past the decoder limit
    NestingTooDeep(usize),
}

impl fmt::Display for PackStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStreamError::UnexpectedEof => write!(f, "Unexpected end of PackStream data"),
            PackStreamError::UnknownMarker(m) => write!(f, "Unknown PackStream marker: 0x{:02X}", m),
            PackStreamError::InvalidUtf8(e) => write!(f, "Invalid UTF-8 in string: {}", e),
            PackStreamError::InvalidMapKey => write!(f, "Map keys must be strings"),
            PackStreamError::ValueTooLarge(t, s) => write!(f, "{} too large: {} elements", t, s),
            PackStreamError::InvalidStructure(msg) => write!(f, "Invalid structure: {}", msg),
            PackStreamError::TrailingBytes(n) => write!(f, "{} trailing bytes after value", n),
            PackStreamError::NestingTooDeep(max) => {
                write!(f, "Values nested deeper than {} levels", max)
            }
        }
    }
}

impl std::error::Error for PackStreamError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: &PackStreamValue) -> PackStreamValue {
        let bytes = encode(value).unwrap();
        let (decoded, consumed) = decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        decoded
    }

    #[test]
    fn test_roundtrip_scalars() {
        for value in [
            PackStreamValue::Null,
            PackStreamValue::Boolean(true),
            PackStreamValue::Boolean(false),
            PackStreamValue::Float(-0.5),
            PackStreamValue::Float(f64::MAX),
        ] {
            assert_eq!(roundtrip(&value), value);
        }
    }

    #[test]
    fn test_roundtrip_int_boundaries() {
        for v in [
            0i64, -16, -17, 127, 128, -128, -129, 32767, 32768, -32768, -32769,
            2147483647, 2147483648, -2147483648, -2147483649, i64::MAX, i64::MIN,
        ] {
            let value = PackStreamValue::Integer(v);
            assert_eq!(roundtrip(&value), value, "Failed for {}", v);
            assert_eq!(encode(&value).unwrap().len(), marker::encoded_int_len(v));
        }
    }

    #[test]
    fn test_roundtrip_string() {
        for s in ["", "a", "hello world", "한글 문자열", &"x".repeat(255), &"y".repeat(70000)] {
            let value = PackStreamValue::String(s.to_string());
            assert_eq!(roundtrip(&value), value);
        }
    }

    #[test]
    fn test_roundtrip_nested() {
        let mut inner = PackStreamMap::new();
        inner.insert(
            "items",
            PackStreamValue::List(vec![PackStreamValue::Integer(1), PackStreamValue::Integer(2)]),
        );
        let value = PackStreamValue::List(vec![
            PackStreamValue::Map(inner.clone()),
            PackStreamValue::Structure(PackStreamStructure::new(
                0x4E,
                vec![
                    PackStreamValue::Integer(1),
                    PackStreamValue::List(vec!["Person".into()]),
                    PackStreamValue::Map(inner),
                ],
            )),
        ]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_roundtrip_large_map() {
        let map: PackStreamMap = (0..300).map(|i| (format!("k{}", i), i as i64)).collect();
        let value = PackStreamValue::Map(map);
        let bytes = encode(&value).unwrap();
        assert_eq!(&bytes[..3], &[0xD9, 0x01, 0x2C]);
        assert_eq!(roundtrip(&value), value);
    }
}
