//! PackStream decoder.
//!
//! Accepts every size tier for every type, not only the minimal one.
//! Containers may nest at most [`MAX_NESTING_DEPTH`] levels deep.

use bytes::Buf;

use super::map::PackStreamMap;
use super::marker::*;
use super::types::{PackStreamStructure, PackStreamValue};
use super::PackStreamError;

/// Deepest container nesting the decoder accepts.
///
/// A message structure counts as one level, so a RECORD may carry values
/// nested one level less.
pub const MAX_NESTING_DEPTH: usize = 256;

/// PackStream decoder that reads values from a byte buffer.
pub struct PackStreamDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> PackStreamDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Get the current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes count.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> Result<PackStreamValue, PackStreamError> {
        let marker = self.read_u8()?;

        if is_tiny_int(marker) {
            return Ok(PackStreamValue::Integer(decode_tiny_int(marker) as i64));
        }
        if is_tiny_string(marker) {
            return self.read_string_data(tiny_size(marker));
        }
        if is_tiny_list(marker) {
            return self.read_list_data(tiny_size(marker));
        }
        if is_tiny_map(marker) {
            return self.read_map_data(tiny_size(marker));
        }
        if is_tiny_struct(marker) {
            return self.read_struct_data(tiny_size(marker));
        }

        match marker {
            NULL => Ok(PackStreamValue::Null),
            TRUE => Ok(PackStreamValue::Boolean(true)),
            FALSE => Ok(PackStreamValue::Boolean(false)),

            FLOAT_64 => Ok(PackStreamValue::Float(self.read_f64()?)),

            INT_8 => Ok(PackStreamValue::Integer(self.read_i8()? as i64)),
            INT_16 => Ok(PackStreamValue::Integer(self.read_i16()? as i64)),
            INT_32 => Ok(PackStreamValue::Integer(self.read_i32()? as i64)),
            INT_64 => Ok(PackStreamValue::Integer(self.read_i64()?)),

            STRING_8 => {
                let len = self.read_u8()? as usize;
                self.read_string_data(len)
            }
            STRING_16 => {
                let len = self.read_u16()? as usize;
                self.read_string_data(len)
            }
            STRING_32 => {
                let len = self.read_u32()? as usize;
                self.read_string_data(len)
            }

            LIST_8 => {
                let len = self.read_u8()? as usize;
                self.read_list_data(len)
            }
            LIST_16 => {
                let len = self.read_u16()? as usize;
                self.read_list_data(len)
            }
            LIST_32 => {
                let len = self.read_u32()? as usize;
                self.read_list_data(len)
            }

            MAP_8 => {
                let len = self.read_u8()? as usize;
                self.read_map_data(len)
            }
            MAP_16 => {
                let len = self.read_u16()? as usize;
                self.read_map_data(len)
            }
            MAP_32 => {
                let len = self.read_u32()? as usize;
                self.read_map_data(len)
            }

            STRUCT_8 => {
                let len = self.read_u8()? as usize;
                self.read_struct_data(len)
            }
            STRUCT_16 => {
                let len = self.read_u16()? as usize;
                self.read_struct_data(len)
            }

            _ => Err(PackStreamError::UnknownMarker(marker)),
        }
    }

    fn read_string_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        let bytes = self.read_bytes(len)?;
        let s = std::str::from_utf8(bytes)
            .map_err(|e| PackStreamError::InvalidUtf8(e.to_string()))?;
        Ok(PackStreamValue::String(s.to_string()))
    }

    /// Run `read` one container level deeper.
    fn nested<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, PackStreamError>,
    ) -> Result<T, PackStreamError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(PackStreamError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    // Capacity hints are capped: sizes come off the wire before any element is read.
    fn read_list_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        self.nested(|d| {
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(d.decode()?);
            }
            Ok(PackStreamValue::List(items))
        })
    }

    fn read_map_data(&mut self, len: usize) -> Result<PackStreamValue, PackStreamError> {
        self.nested(|d| {
            let mut map = PackStreamMap::with_capacity(len.min(1024));
            for _ in 0..len {
                let key = match d.decode()? {
                    PackStreamValue::String(s) => s,
                    _ => return Err(PackStreamError::InvalidMapKey),
                };
                let value = d.decode()?;
                map.insert(key, value);
            }
            Ok(PackStreamValue::Map(map))
        })
    }

    fn read_struct_data(&mut self, field_count: usize) -> Result<PackStreamValue, PackStreamError> {
        self.nested(|d| {
            let signature = d.read_u8()?;
            let mut fields = Vec::with_capacity(field_count.min(64));
            for _ in 0..field_count {
                fields.push(d.decode()?);
            }
            Ok(PackStreamValue::Structure(PackStreamStructure::new(
                signature, fields,
            )))
        })
    }

    // Low-level read methods

    fn read_u8(&mut self) -> Result<u8, PackStreamError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_i8(&mut self) -> Result<i8, PackStreamError> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16(&mut self) -> Result<u16, PackStreamError> {
        Ok(self.read_bytes(2)?.get_u16())
    }

    fn read_i16(&mut self) -> Result<i16, PackStreamError> {
        Ok(self.read_bytes(2)?.get_i16())
    }

    fn read_u32(&mut self) -> Result<u32, PackStreamError> {
        Ok(self.read_bytes(4)?.get_u32())
    }

    fn read_i32(&mut self) -> Result<i32, PackStreamError> {
        Ok(self.read_bytes(4)?.get_i32())
    }

    fn read_i64(&mut self) -> Result<i64, PackStreamError> {
        Ok(self.read_bytes(8)?.get_i64())
    }

    fn read_f64(&mut self) -> Result<f64, PackStreamError> {
        Ok(self.read_bytes(8)?.get_f64())
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PackStreamError> {
        if self.remaining() < len {
            return Err(PackStreamError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}

/// Decode the first value in `data`, returning it with the number of bytes it used.
pub fn decode(data: &[u8]) -> Result<(PackStreamValue, usize), PackStreamError> {
    let mut decoder = PackStreamDecoder::new(data);
    let value = decoder.decode()?;
    Ok((value, decoder.position()))
}

/// Decode exactly one value spanning all of `data`.
pub fn decode_exact(data: &[u8]) -> Result<PackStreamValue, PackStreamError> {
    let mut decoder = PackStreamDecoder::new(data);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(PackStreamError::TrailingBytes(decoder.remaining()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(data: &[u8]) -> PackStreamValue {
        decode(data).unwrap().0
    }

    #[test]
    fn test_decode_null() {
        assert!(value(&[0xC0]).is_null());
    }

    #[test]
    fn test_decode_bool() {
        assert_eq!(value(&[0xC3]), PackStreamValue::Boolean(true));
        assert_eq!(value(&[0xC2]), PackStreamValue::Boolean(false));
    }

    #[test]
    fn test_decode_tiny_int() {
        assert_eq!(value(&[0x00]), PackStreamValue::Integer(0));
        assert_eq!(value(&[0x7F]), PackStreamValue::Integer(127));
        assert_eq!(value(&[0xF0]), PackStreamValue::Integer(-16));
        assert_eq!(value(&[0xFF]), PackStreamValue::Integer(-1));
    }

    #[test]
    fn test_decode_wide_ints() {
        assert_eq!(value(&[0xC8, 0xEF]), PackStreamValue::Integer(-17));
        assert_eq!(value(&[0xC9, 0x03, 0xE8]), PackStreamValue::Integer(1000));
        assert_eq!(value(&[0xCA, 0x00, 0x01, 0x86, 0xA0]), PackStreamValue::Integer(100000));
        assert_eq!(
            value(&[0xCB, 0x80, 0, 0, 0, 0, 0, 0, 0]),
            PackStreamValue::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_decode_oversized_int_tier() {
        // 42 written as INT_64 still decodes to 42
        assert_eq!(
            value(&[0xCB, 0, 0, 0, 0, 0, 0, 0, 42]),
            PackStreamValue::Integer(42)
        );
    }

    #[test]
    fn test_decode_string_32_of_three_bytes() {
        let data = [0xD2, 0x00, 0x00, 0x00, 0x03, b'a', b'b', b'c'];
        let (decoded, consumed) = decode(&data).unwrap();
        assert_eq!(decoded, PackStreamValue::String("abc".into()));
        assert_eq!(consumed, data.len());
    }

    #[test]
    fn test_decode_list_16_of_one_item() {
        assert_eq!(
            value(&[0xD5, 0x00, 0x01, 0x01]),
            PackStreamValue::List(vec![PackStreamValue::Integer(1)])
        );
    }

    #[test]
    fn test_decode_map_8() {
        let decoded = value(&[0xD8, 0x01, 0x81, b'k', 0xC3]);
        let map = decoded.as_map().unwrap();
        assert_eq!(map.get("k"), Some(&PackStreamValue::Boolean(true)));
    }

    #[test]
    fn test_decode_struct() {
        let decoded = value(&[0xB1, 0x71, 0x91, 0x01]);
        let s = decoded.as_structure().unwrap();
        assert_eq!(s.signature, 0x71);
        assert_eq!(s.fields, vec![PackStreamValue::List(vec![PackStreamValue::Integer(1)])]);
    }

    #[test]
    fn test_decode_reports_consumed_bytes() {
        let (decoded, consumed) = decode(&[0x85, b'h', b'e', b'l', b'l', b'o', 0xC0]).unwrap();
        assert_eq!(decoded, PackStreamValue::String("hello".into()));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(decode(&[]), Err(PackStreamError::UnexpectedEof)));
        assert!(matches!(decode(&[0xC9, 0x01]), Err(PackStreamError::UnexpectedEof)));
        assert!(matches!(decode(&[0x83, b'a']), Err(PackStreamError::UnexpectedEof)));
        assert!(matches!(decode(&[0x92, 0x01]), Err(PackStreamError::UnexpectedEof)));
    }

    #[test]
    fn test_decode_unknown_marker() {
        // Bytes markers are not part of this value model
        for marker in [0xCC, 0xCD, 0xCE, 0xC4, 0xD3, 0xDE, 0xE0, 0xEF] {
            assert!(matches!(
                decode(&[marker, 0x00]),
                Err(PackStreamError::UnknownMarker(m)) if m == marker
            ));
        }
    }

    #[test]
    fn test_decode_invalid_map_key() {
        assert!(matches!(
            decode(&[0xA1, 0x01, 0x01]),
            Err(PackStreamError::InvalidMapKey)
        ));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert!(matches!(
            decode(&[0x82, 0xFF, 0xFE]),
            Err(PackStreamError::InvalidUtf8(_))
        ));
    }

    fn nested_lists(depth: usize) -> Vec<u8> {
        let mut data = vec![0x91; depth];
        data.push(0xC0);
        data
    }

    #[test]
    fn test_decode_nesting_at_limit() {
        let mut decoded = value(&nested_lists(MAX_NESTING_DEPTH));
        let mut levels = 0;
        while let PackStreamValue::List(mut items) = decoded {
            levels += 1;
            decoded = items.pop().unwrap();
        }
        assert_eq!(levels, MAX_NESTING_DEPTH);
        assert!(decoded.is_null());
    }

    #[test]
    fn test_decode_rejects_deep_nesting() {
        assert!(matches!(
            decode(&nested_lists(MAX_NESTING_DEPTH + 1)),
            Err(PackStreamError::NestingTooDeep(MAX_NESTING_DEPTH))
        ));

        // a small message wrapping 200k levels fails instead of exhausting the stack
        let mut message = vec![0xB1, 0x71];
        message.extend(nested_lists(200_001));
        assert!(matches!(
            decode(&message),
            Err(PackStreamError::NestingTooDeep(_))
        ));

        // maps and structures count toward the same limit
        let mut mixed = Vec::new();
        for _ in 0..MAX_NESTING_DEPTH {
            mixed.extend([0xA1, 0x81, b'k', 0xB1, 0x4E]);
        }
        mixed.push(0xC0);
        assert!(matches!(
            decode(&mixed),
            Err(PackStreamError::NestingTooDeep(_))
        ));
    }

    #[test]
    fn test_decode_depth_resets_between_siblings() {
        // two siblings each half the limit deep
        let half = MAX_NESTING_DEPTH / 2;
        let mut data = vec![0x92];
        data.extend(nested_lists(half));
        data.extend(nested_lists(half));
        let decoded = value(&data);
        assert_eq!(decoded.as_list().map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_decode_large_map() {
        let n = 50_000u32;
        let mut data = vec![0xDA];
        data.extend_from_slice(&n.to_be_bytes());
        for i in 0..n {
            let key = format!("{:08}", i);
            data.push(0x88);
            data.extend_from_slice(key.as_bytes());
            data.extend([0xCA]);
            data.extend_from_slice(&(i as i32).to_be_bytes());
        }

        let started = std::time::Instant::now();
        let decoded = value(&data);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        let map = decoded.as_map().unwrap();
        assert_eq!(map.len(), n as usize);
        assert_eq!(map.get("00049999"), Some(&PackStreamValue::Integer(49_999)));
        assert_eq!(map.keys().next().map(String::as_str), Some("00000000"));
    }

    #[test]
    fn test_decode_exact_rejects_trailing() {
        assert_eq!(decode_exact(&[0x01]).unwrap(), PackStreamValue::Integer(1));
        assert!(matches!(
            decode_exact(&[0x01, 0x02]),
            Err(PackStreamError::TrailingBytes(1))
        ));
    }
}
