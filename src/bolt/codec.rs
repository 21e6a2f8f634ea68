//! Bolt chunk framing.
//!
//! Implements chunked message framing as defined by the Bolt protocol.
//! Messages are split into chunks with a 2-byte length prefix and end with
//! a zero-length chunk.

use bytes::{BufMut, BytesMut};
use tracing::trace;

use super::error::{BoltError, FramingError, TransportError};
use super::transport::Transport;

/// Largest chunk a 16-bit length prefix can describe.
pub const MAX_CHUNK_SIZE: usize = 65535;

/// Default ceiling on a reassembled message (16MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// End of message marker (0x00 0x00)
pub const END_MARKER: [u8; 2] = [0x00, 0x00];

/// Splits outgoing messages into chunks and reassembles incoming ones.
///
/// The framer is stateless between messages; it never looks inside a
/// payload.
#[derive(Debug, Clone, Copy)]
pub struct ChunkFramer {
    max_chunk_size: usize,
    max_message_size: usize,
}

impl ChunkFramer {
    /// Create a framer with the protocol maximum chunk size.
    pub fn new() -> Self {
        Self {
            max_chunk_size: MAX_CHUNK_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Create a framer with custom limits.
    ///
    /// `max_chunk_size` must not exceed [`MAX_CHUNK_SIZE`]; zero is raised to one.
    pub fn with_limits(max_chunk_size: usize, max_message_size: usize) -> Result<Self, FramingError> {
        if max_chunk_size > MAX_CHUNK_SIZE {
            return Err(FramingError::ChunkTooLarge(max_chunk_size));
        }
        Ok(Self {
            max_chunk_size: max_chunk_size.max(1),
            max_message_size,
        })
    }

    /// Largest chunk this framer writes.
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Largest message this framer accepts.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Append the framed form of `data` to `dst`.
    pub fn frame(&self, data: &[u8], dst: &mut BytesMut) {
        dst.reserve(data.len() + 2 * (data.len() / self.max_chunk_size + 2));

        for chunk in data.chunks(self.max_chunk_size) {
            // Write chunk header (2-byte big-endian length)
            dst.put_u16(chunk.len() as u16);
            dst.put_slice(chunk);
        }

        dst.put_slice(&END_MARKER);
    }

    /// Frame `data` and write it to the transport in one call.
    pub fn send(&self, data: &[u8], transport: &mut dyn Transport) -> Result<(), TransportError> {
        let mut framed = BytesMut::new();
        self.frame(data, &mut framed);
        trace!(
            payload = data.len(),
            chunks = data.len().div_ceil(self.max_chunk_size),
            "Sending message"
        );
        transport.write(&framed)
    }

    /// Read one complete message.
    ///
    /// An empty result means the peer sent a bare end marker (a NOOP).
    pub fn receive(&self, transport: &mut dyn Transport) -> Result<BytesMut, BoltError> {
        let mut message = BytesMut::new();
        let mut chunks = 0usize;

        loop {
            let header = transport.read(2)?;
            let chunk_size = u16::from_be_bytes([header[0], header[1]]) as usize;

            if chunk_size == 0 {
                trace!(payload = message.len(), chunks, "Received message");
                return Ok(message);
            }

            if message.len() + chunk_size > self.max_message_size {
                return Err(FramingError::MessageTooLarge {
                    size: message.len() + chunk_size,
                    max: self.max_message_size,
                }
                .into());
            }

            let chunk = transport
                .read(chunk_size)
                .map_err(|source| FramingError::IncompleteChunk {
                    expected: chunk_size,
                    source,
                })?;
            message.extend_from_slice(&chunk);
            chunks += 1;
        }
    }
}

impl Default for ChunkFramer {
    fn default() -> Self {
        Self::new()
    }
}
