//! Version negotiation.
//!
//! Before any message is exchanged the client writes a 20-byte preamble,
//! the magic `60 60 B0 17` followed by four big-endian version proposals
//! (zero-padded), and the server answers with the single version it picked
//! or [`NO_VERSION`]. The exchange happens once per connection.

mod negotiation;
mod version;

pub use negotiation::{Handshake, DEFAULT_PROPOSALS};
pub use version::BoltVersion;

pub use super::error::HandshakeError;

/// Magic bytes opening every Bolt connection.
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Length of the client preamble: magic plus four proposals.
pub const HANDSHAKE_SIZE: usize = BOLT_MAGIC.len() + 4 * 4;

/// Length of the server's answer.
pub const HANDSHAKE_RESPONSE_SIZE: usize = 4;

/// Server answer meaning none of the proposals is supported.
pub const NO_VERSION: u32 = 0;

/// Whether `bytes` start with a complete client preamble.
pub fn is_preamble(bytes: &[u8]) -> bool {
    bytes.len() >= HANDSHAKE_SIZE && bytes[..BOLT_MAGIC.len()] == BOLT_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_layout() {
        assert_eq!(u32::from_be_bytes(BOLT_MAGIC), 0x6060_B017);
        assert_eq!(HANDSHAKE_SIZE, 20);
    }

    #[test]
    fn test_is_preamble() {
        let preamble = Handshake::new().request_bytes();
        assert!(is_preamble(&preamble));
        assert!(!is_preamble(&preamble[..19]));
        assert!(!is_preamble(&[0u8; 20]));
    }
}
