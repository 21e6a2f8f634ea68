//! Bolt protocol version definitions.

use std::fmt;

use super::NO_VERSION;

/// A negotiated Bolt protocol version.
///
/// Versions travel as 4-byte big-endian integers. The low byte carries the
/// major version and the next byte the minor version, so Bolt 1 is plain
/// `0x00000001`. Zero is reserved for "no agreement" and never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoltVersion(u32);

impl BoltVersion {
    /// Bolt 1: INIT / RUN / PULL_ALL / DISCARD_ALL / ACK_FAILURE / RESET.
    pub const V1: BoltVersion = BoltVersion(1);

    /// Wrap a raw version number; returns `None` for the zero sentinel.
    pub fn new(raw: u32) -> Option<Self> {
        (raw != NO_VERSION).then_some(BoltVersion(raw))
    }

    /// Get the raw u32 value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Get the major version number.
    pub fn major(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Get the minor version number.
    pub fn minor(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Convert to big-endian bytes.
    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Parse from big-endian bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        Self::new(u32::from_be_bytes(bytes))
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_not_a_version() {
        assert_eq!(BoltVersion::new(0), None);
        assert_eq!(BoltVersion::from_bytes([0, 0, 0, 0]), None);
    }

    #[test]
    fn test_version_bytes() {
        assert_eq!(BoltVersion::V1.to_bytes(), [0x00, 0x00, 0x00, 0x01]);
        assert_eq!(BoltVersion::from_bytes([0, 0, 0, 1]), Some(BoltVersion::V1));
    }

    #[test]
    fn test_version_major_minor() {
        assert_eq!(BoltVersion::V1.major(), 1);
        assert_eq!(BoltVersion::V1.minor(), 0);

        let v = BoltVersion::new(0x0000_0104).unwrap();
        assert_eq!(v.major(), 4);
        assert_eq!(v.minor(), 1);
        assert_eq!(v.to_string(), "4.1");
    }

    #[test]
    fn test_version_ordering() {
        assert!(BoltVersion::new(2).unwrap() > BoltVersion::V1);
    }
}
