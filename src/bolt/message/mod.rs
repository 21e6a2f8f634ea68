//! Bolt protocol message types.
//!
//! This module implements the Bolt v1 request and response messages. Every
//! message is one PackStream structure whose signature names the message.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

use bytes::BytesMut;

use crate::bolt::packstream::{
    decode_exact, PackStreamEncoder, PackStreamError, PackStreamStructure, PackStreamValue,
};

/// Bolt v1 message signatures.
pub mod signature {
    /// INIT message signature (0x01)
    pub const INIT: u8 = 0x01;
    /// ACK_FAILURE message signature (0x0E)
    pub const ACK_FAILURE: u8 = 0x0E;
    /// RESET message signature (0x0F)
    pub const RESET: u8 = 0x0F;
    /// RUN message signature (0x10)
    pub const RUN: u8 = 0x10;
    /// DISCARD_ALL message signature (0x2F)
    pub const DISCARD_ALL: u8 = 0x2F;
    /// PULL_ALL message signature (0x3F)
    pub const PULL_ALL: u8 = 0x3F;

    /// SUCCESS response signature (0x70)
    pub const SUCCESS: u8 = 0x70;
    /// RECORD response signature (0x71)
    pub const RECORD: u8 = 0x71;
    /// IGNORED response signature (0x7E)
    pub const IGNORED: u8 = 0x7E;
    /// FAILURE response signature (0x7F)
    pub const FAILURE: u8 = 0x7F;
}

/// Encode a message structure into an unframed payload.
pub fn encode_message(message: &PackStreamStructure) -> Result<BytesMut, PackStreamError> {
    let mut encoder = PackStreamEncoder::new();
    encoder.encode_structure(message)?;
    Ok(encoder.into_bytes())
}

/// Decode an unframed payload that must hold exactly one structure.
pub fn decode_message(payload: &[u8]) -> Result<PackStreamStructure, PackStreamError> {
    match decode_exact(payload)? {
        PackStreamValue::Structure(s) => Ok(s),
        other => Err(PackStreamError::InvalidStructure(format!(
            "Expected message structure, got {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::signature::*;
    use super::*;

    #[test]
    fn test_request_signatures() {
        assert_eq!(INIT, 0x01);
        assert_eq!(ACK_FAILURE, 0x0E);
        assert_eq!(RESET, 0x0F);
        assert_eq!(RUN, 0x10);
        assert_eq!(DISCARD_ALL, 0x2F);
        assert_eq!(PULL_ALL, 0x3F);
    }

    #[test]
    fn test_response_signatures() {
        assert_eq!(SUCCESS, 0x70);
        assert_eq!(RECORD, 0x71);
        assert_eq!(IGNORED, 0x7E);
        assert_eq!(FAILURE, 0x7F);
    }

    #[test]
    fn test_encode_pull_all() {
        let payload = encode_message(&BoltRequest::PullAll.to_structure()).unwrap();
        assert_eq!(&payload[..], &[0xB0, 0x3F]);
    }

    #[test]
    fn test_decode_message_requires_structure() {
        assert!(matches!(
            decode_message(&[0x01]),
            Err(PackStreamError::InvalidStructure(_))
        ));
        assert!(matches!(
            decode_message(&[0xB0, 0x7E, 0x00]),
            Err(PackStreamError::TrailingBytes(1))
        ));
        assert_eq!(decode_message(&[0xB0, 0x7E]).unwrap().signature, IGNORED);
    }
}
