//! Bolt protocol error types.

use std::io;

use thiserror::Error;

use super::packstream::PackStreamError;

/// Result type for Bolt operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Byte-stream transport errors.
///
/// Every one of these is fatal to the connection that raised it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not open a socket to the address
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        /// Address the connection was attempted to
        address: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// Operation on a transport that is not connected
    #[error("Transport is not connected")]
    NotConnected,

    /// The peer closed the stream before `expected` bytes arrived
    #[error("Connection closed by peer while reading {expected} bytes")]
    UnexpectedEof {
        /// Bytes the read was waiting for
        expected: usize,
    },

    /// Any other socket fault
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Handshake-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// The server answered 0: none of the proposals is acceptable
    #[error("No compatible protocol version found (proposed {proposed:?})")]
    NoCompatibleVersion {
        /// Versions offered by the client
        proposed: [u32; 4],
    },

    /// The transport failed while negotiating
    #[error("Handshake failed: {0}")]
    Transport(String),
}

/// Chunk framing errors.
#[derive(Debug, Error)]
pub enum FramingError {
    /// A chunk cannot be longer than a 16-bit length prefix allows
    #[error("Chunk size {0} exceeds the 65535 byte limit")]
    ChunkTooLarge(usize),

    /// The stream ended in the middle of a chunk body
    #[error("Stream ended mid-chunk ({expected} bytes expected)")]
    IncompleteChunk {
        /// Chunk body length announced by the header
        expected: usize,
        /// Fault that cut the read short
        #[source]
        source: TransportError,
    },

    /// Reassembled message exceeds the configured ceiling
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Bytes received so far
        size: usize,
        /// Configured limit
        max: usize,
    },
}

/// Bolt protocol errors.
#[derive(Debug, Error)]
pub enum BoltError {
    /// Transport fault
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Chunk framing violation
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// PackStream serialization error
    #[error("PackStream error: {0}")]
    PackStream(#[from] PackStreamError),

    /// Handshake error
    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// Protocol error (invalid message format, etc.)
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<io::Error> for BoltError {
    fn from(err: io::Error) -> Self {
        BoltError::Transport(TransportError::Io(err))
    }
}
