//! # Bolt v1 protocol
//!
//! Everything below the driver: the byte-level pieces that turn requests
//! into framed PackStream structures and back.
//!
//! A connection runs through these layers in order:
//!
//! 1. [`handshake`] agrees on a protocol version over a fresh [`Transport`]
//! 2. [`codec`] splits each message into length-prefixed chunks
//! 3. [`packstream`] encodes the message structure inside those chunks
//! 4. [`message`] gives the v1 requests and responses their shape
//!
//! Failures from any layer surface as [`BoltError`] (see [`error`]). The
//! session state machine that sequences messages lives in
//! [`crate::driver`].

pub mod codec;
pub mod error;
pub mod handshake;
pub mod message;
pub mod packstream;
pub mod transport;

pub use codec::{ChunkFramer, MAX_CHUNK_SIZE};
pub use error::{BoltError, BoltResult, FramingError, HandshakeError, TransportError};
pub use handshake::{BoltVersion, Handshake, BOLT_MAGIC, HANDSHAKE_RESPONSE_SIZE};
pub use message::{
    BoltRequest, BoltResponse, FailureMessage, InitMessage, RecordMessage, RunMessage,
    SuccessMessage,
};
pub use packstream::{
    PackStreamDecoder, PackStreamEncoder, PackStreamError, PackStreamMap, PackStreamStructure,
    PackStreamValue,
};
pub use transport::{MemoryTransport, Transport};
