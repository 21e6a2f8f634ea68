//! PackStream type markers.
//!
//! Each encoded value starts with a marker byte. The high nibble selects the
//! type family for the tiny forms; the low nibble carries the inline size.

/// Null
pub const NULL: u8 = 0xC0;

/// Boolean false
pub const FALSE: u8 = 0xC2;
/// Boolean true
pub const TRUE: u8 = 0xC3;

/// 64-bit IEEE 754 float
pub const FLOAT_64: u8 = 0xC1;

// Integers. Values in -16..=127 are the marker byte itself.

/// Smallest tiny integer marker (-16)
pub const TINY_INT_MIN: u8 = 0xF0;
/// Largest tiny integer marker (127)
pub const TINY_INT_MAX: u8 = 0x7F;
/// 8-bit signed integer
pub const INT_8: u8 = 0xC8;
/// 16-bit signed integer
pub const INT_16: u8 = 0xC9;
/// 32-bit signed integer
pub const INT_32: u8 = 0xCA;
/// 64-bit signed integer
pub const INT_64: u8 = 0xCB;

// Strings. Up to 15 UTF-8 bytes use 0x80-0x8F.

/// Tiny string marker with length 0
pub const TINY_STRING_BASE: u8 = 0x80;
/// Longest tiny string in bytes
pub const TINY_STRING_MAX_LEN: usize = 15;
/// String with an 8-bit length
pub const STRING_8: u8 = 0xD0;
/// String with a 16-bit length
pub const STRING_16: u8 = 0xD1;
/// String with a 32-bit length
pub const STRING_32: u8 = 0xD2;

// Lists. Up to 15 elements use 0x90-0x9F.

/// Tiny list marker with 0 elements
pub const TINY_LIST_BASE: u8 = 0x90;
/// Largest tiny list
pub const TINY_LIST_MAX_LEN: usize = 15;
/// List with an 8-bit size
pub const LIST_8: u8 = 0xD4;
/// List with a 16-bit size
pub const LIST_16: u8 = 0xD5;
/// List with a 32-bit size
pub const LIST_32: u8 = 0xD6;

// Maps. Up to 15 entries use 0xA0-0xAF.

/// Tiny map marker with 0 entries
pub const TINY_MAP_BASE: u8 = 0xA0;
/// Largest tiny map
pub const TINY_MAP_MAX_LEN: usize = 15;
/// Map with an 8-bit size
pub const MAP_8: u8 = 0xD8;
/// Map with a 16-bit size
pub const MAP_16: u8 = 0xD9;
/// Map with a 32-bit size
pub const MAP_32: u8 = 0xDA;

// Structures. Up to 15 fields use 0xB0-0xBF.

/// Tiny structure marker with 0 fields
pub const TINY_STRUCT_BASE: u8 = 0xB0;
/// Largest tiny structure
pub const TINY_STRUCT_MAX_FIELDS: usize = 15;
/// Structure with an 8-bit field count
pub const STRUCT_8: u8 = 0xDC;
/// Structure with a 16-bit field count
pub const STRUCT_16: u8 = 0xDD;

/// Check if a byte is a tiny integer marker (-16 to 127)
#[inline]
pub fn is_tiny_int(marker: u8) -> bool {
    marker <= TINY_INT_MAX || marker >= TINY_INT_MIN
}

/// Decode a tiny integer from its marker byte
#[inline]
pub fn decode_tiny_int(marker: u8) -> i8 {
    marker as i8
}

/// Check if an integer can be encoded as a tiny int
#[inline]
pub fn can_encode_tiny_int(value: i64) -> bool {
    (-16..=127).contains(&value)
}

/// Check if a byte is a tiny string marker (0x80-0x8F)
#[inline]
pub fn is_tiny_string(marker: u8) -> bool {
    marker & 0xF0 == TINY_STRING_BASE
}

/// Check if a byte is a tiny list marker (0x90-0x9F)
#[inline]
pub fn is_tiny_list(marker: u8) -> bool {
    marker & 0xF0 == TINY_LIST_BASE
}

/// Check if a byte is a tiny map marker (0xA0-0xAF)
#[inline]
pub fn is_tiny_map(marker: u8) -> bool {
    marker & 0xF0 == TINY_MAP_BASE
}

/// Check if a byte is a tiny struct marker (0xB0-0xBF)
#[inline]
pub fn is_tiny_struct(marker: u8) -> bool {
    marker & 0xF0 == TINY_STRUCT_BASE
}

/// Size carried in the low nibble of any tiny marker
#[inline]
pub fn tiny_size(marker: u8) -> usize {
    (marker & 0x0F) as usize
}

/// Number of bytes an integer occupies once encoded, marker included.
pub fn encoded_int_len(value: i64) -> usize {
    if can_encode_tiny_int(value) {
        1
    } else if i8::try_from(value).is_ok() {
        2
    } else if i16::try_from(value).is_ok() {
        3
    } else if i32::try_from(value).is_ok() {
        5
    } else {
        9
    }
}
