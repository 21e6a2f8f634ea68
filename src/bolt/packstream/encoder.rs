//! PackStream encoder.
//!
//! Always writes the smallest size tier that can hold a value.

use bytes::{BufMut, BytesMut};

use super::map::PackStreamMap;
use super::marker::*;
use super::types::{PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// PackStream encoder that writes values to a byte buffer.
pub struct PackStreamEncoder {
    buffer: BytesMut,
}

impl PackStreamEncoder {
    /// Create a new encoder with default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new encoder with specified buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the encoder and return the bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buffer
    }

    /// Get the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Encode a PackStreamValue.
    pub fn encode(&mut self, value: &PackStreamValue) -> Result<(), PackStreamError> {
        match value {
            PackStreamValue::Null => {
                self.encode_null();
                Ok(())
            }
            PackStreamValue::Boolean(b) => {
                self.encode_bool(*b);
                Ok(())
            }
            PackStreamValue::Integer(i) => {
                self.encode_int(*i);
                Ok(())
            }
            PackStreamValue::Float(f) => {
                self.encode_float(*f);
                Ok(())
            }
            PackStreamValue::String(s) => self.encode_string(s),
            PackStreamValue::List(l) => self.encode_list(l),
            PackStreamValue::Map(m) => self.encode_map(m),
            PackStreamValue::Structure(s) => self.encode_structure(s),
        }
    }

    /// Encode null.
    pub fn encode_null(&mut self) {
        self.buffer.put_u8(NULL);
    }

    /// Encode a boolean.
    pub fn encode_bool(&mut self, value: bool) {
        self.buffer.put_u8(if value { TRUE } else { FALSE });
    }

    /// Encode an integer using the smallest representation.
    pub fn encode_int(&mut self, value: i64) {
        if can_encode_tiny_int(value) {
            self.buffer.put_u8(value as u8);
        } else if let Ok(v) = i8::try_from(value) {
            self.buffer.put_u8(INT_8);
            self.buffer.put_i8(v);
        } else if let Ok(v) = i16::try_from(value) {
            self.buffer.put_u8(INT_16);
            self.buffer.put_i16(v);
        } else if let Ok(v) = i32::try_from(value) {
            self.buffer.put_u8(INT_32);
            self.buffer.put_i32(v);
        } else {
            self.buffer.put_u8(INT_64);
            self.buffer.put_i64(value);
        }
    }

    /// Encode a float (always 64-bit).
    pub fn encode_float(&mut self, value: f64) {
        self.buffer.put_u8(FLOAT_64);
        self.buffer.put_f64(value);
    }

    /// Encode a string.
    pub fn encode_string(&mut self, value: &str) -> Result<(), PackStreamError> {
        let bytes = value.as_bytes();
        self.encode_size(
            "string",
            bytes.len(),
            TINY_STRING_BASE,
            [STRING_8, STRING_16, STRING_32],
        )?;
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Encode a list.
    pub fn encode_list(&mut self, values: &[PackStreamValue]) -> Result<(), PackStreamError> {
        self.encode_size("list", values.len(), TINY_LIST_BASE, [LIST_8, LIST_16, LIST_32])?;
        for value in values {
            self.encode(value)?;
        }
        Ok(())
    }

    /// Encode a map. Entries are written in insertion order.
    pub fn encode_map(&mut self, map: &PackStreamMap) -> Result<(), PackStreamError> {
        self.encode_size("map", map.len(), TINY_MAP_BASE, [MAP_8, MAP_16, MAP_32])?;
        for (key, value) in map.iter() {
            self.encode_string(key)?;
            self.encode(value)?;
        }
        Ok(())
    }

    /// Encode a structure.
    pub fn encode_structure(&mut self, s: &PackStreamStructure) -> Result<(), PackStreamError> {
        let len = s.fields.len();

        if len <= TINY_STRUCT_MAX_FIELDS {
            self.buffer.put_u8(TINY_STRUCT_BASE + len as u8);
        } else if let Ok(n) = u8::try_from(len) {
            self.buffer.put_u8(STRUCT_8);
            self.buffer.put_u8(n);
        } else if let Ok(n) = u16::try_from(len) {
            self.buffer.put_u8(STRUCT_16);
            self.buffer.put_u16(n);
        } else {
            return Err(PackStreamError::ValueTooLarge("structure fields", len));
        }

        self.buffer.put_u8(s.signature);

        for field in &s.fields {
            self.encode(field)?;
        }

        Ok(())
    }

    /// Write the marker (and size field) for a sized container.
    ///
    /// The tiny form is used up to 15 elements, then the 8, 16 and 32-bit tiers.
    fn encode_size(
        &mut self,
        kind: &'static str,
        len: usize,
        tiny_base: u8,
        [marker_8, marker_16, marker_32]: [u8; 3],
    ) -> Result<(), PackStreamError> {
        if len <= 15 {
            self.buffer.put_u8(tiny_base + len as u8);
        } else if let Ok(n) = u8::try_from(len) {
            self.buffer.put_u8(marker_8);
            self.buffer.put_u8(n);
        } else if let Ok(n) = u16::try_from(len) {
            self.buffer.put_u8(marker_16);
            self.buffer.put_u16(n);
        } else if let Ok(n) = u32::try_from(len) {
            self.buffer.put_u8(marker_32);
            self.buffer.put_u32(n);
        } else {
            return Err(PackStreamError::ValueTooLarge(kind, len));
        }
        Ok(())
    }
}

impl Default for PackStreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to encode a single value.
pub fn encode(value: &PackStreamValue) -> Result<BytesMut, PackStreamError> {
    let mut encoder = PackStreamEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_null() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_null();
        assert_eq!(enc.as_bytes(), &[0xC0]);
    }

    #[test]
    fn test_encode_bool() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_bool(true);
        enc.encode_bool(false);
        assert_eq!(enc.as_bytes(), &[0xC3, 0xC2]);
    }

    #[test]
    fn test_encode_tiny_int() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_int(0);
        enc.encode_int(42);
        enc.encode_int(127);
        enc.encode_int(-16);
        enc.encode_int(-1);
        assert_eq!(enc.as_bytes(), &[0x00, 0x2A, 0x7F, 0xF0, 0xFF]);
    }

    #[test]
    fn test_encode_int8() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_int(-17);
        enc.encode_int(-128);
        assert_eq!(enc.as_bytes(), &[0xC8, 0xEF, 0xC8, 0x80]);
    }

    #[test]
    fn test_encode_int16() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_int(128);
        enc.encode_int(1000);
        assert_eq!(enc.as_bytes(), &[0xC9, 0x00, 0x80, 0xC9, 0x03, 0xE8]);
    }

    #[test]
    fn test_encode_int32() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_int(100000);
        assert_eq!(enc.as_bytes(), &[0xCA, 0x00, 0x01, 0x86, 0xA0]);
    }

    #[test]
    fn test_encode_int64() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_int(i64::MAX);
        assert_eq!(
            enc.as_bytes(),
            &[0xCB, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_encode_float() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_float(1.1);
        assert_eq!(
            enc.as_bytes(),
            &[0xC1, 0x3F, 0xF1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9A]
        );
    }

    #[test]
    fn test_encode_tiny_string() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_string("hello").unwrap();
        let bytes = enc.as_bytes();
        assert_eq!(bytes[0], 0x85);
        assert_eq!(&bytes[1..], b"hello");
    }

    #[test]
    fn test_encode_string_tiers() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_string(&"a".repeat(16)).unwrap();
        assert_eq!(&enc.as_bytes()[..2], &[0xD0, 16]);

        let mut enc = PackStreamEncoder::new();
        enc.encode_string(&"a".repeat(256)).unwrap();
        assert_eq!(&enc.as_bytes()[..3], &[0xD1, 0x01, 0x00]);

        let mut enc = PackStreamEncoder::new();
        enc.encode_string(&"a".repeat(65536)).unwrap();
        assert_eq!(&enc.as_bytes()[..5], &[0xD2, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(enc.len(), 5 + 65536);
    }

    #[test]
    fn test_encode_empty_string() {
        let mut enc = PackStreamEncoder::new();
        enc.encode_string("").unwrap();
        assert_eq!(enc.as_bytes(), &[0x80]);
    }

    #[test]
    fn test_encode_tiny_list() {
        let list = vec![
            PackStreamValue::Integer(1),
            PackStreamValue::Integer(2),
            PackStreamValue::Integer(3),
        ];
        let mut enc = PackStreamEncoder::new();
        enc.encode_list(&list).unwrap();
        assert_eq!(enc.as_bytes(), &[0x93, 1, 2, 3]);
    }

    #[test]
    fn test_encode_list_8() {
        let list = vec![PackStreamValue::Null; 16];
        let mut enc = PackStreamEncoder::new();
        enc.encode_list(&list).unwrap();
        assert_eq!(&enc.as_bytes()[..2], &[0xD4, 16]);
        assert_eq!(enc.len(), 2 + 16);
    }

    #[test]
    fn test_encode_map_in_insertion_order() {
        let mut map = PackStreamMap::new();
        map.insert("b", 1i64);
        map.insert("a", 2i64);
        let mut enc = PackStreamEncoder::new();
        enc.encode_map(&map).unwrap();
        assert_eq!(enc.as_bytes(), &[0xA2, 0x81, b'b', 0x01, 0x81, b'a', 0x02]);
    }

    #[test]
    fn test_encode_structure() {
        let s = PackStreamStructure::new(0x10, vec![
            PackStreamValue::String("RETURN 1".into()),
            PackStreamValue::Map(PackStreamMap::new()),
        ]);
        let bytes = encode(&PackStreamValue::Structure(s)).unwrap();
        assert_eq!(bytes[0], 0xB2);
        assert_eq!(bytes[1], 0x10);
        assert_eq!(bytes[2], 0x88);
        assert_eq!(&bytes[3..11], b"RETURN 1");
        assert_eq!(bytes[11], 0xA0);
    }

    #[test]
    fn test_encode_struct_8() {
        let s = PackStreamStructure::new(0x01, vec![PackStreamValue::Null; 16]);
        let mut enc = PackStreamEncoder::new();
        enc.encode_structure(&s).unwrap();
        assert_eq!(&enc.as_bytes()[..3], &[0xDC, 16, 0x01]);
    }
}
