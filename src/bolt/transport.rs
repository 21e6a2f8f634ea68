//! Byte-stream transport abstraction.
//!
//! The protocol layer only ever talks to a [`Transport`]: the handshake,
//! the chunk framer and the session all read and write through it. The TCP
//! implementation lives in [`crate::driver::bolt::connection`]; this module
//! also provides [`MemoryTransport`], a scripted in-process peer.

use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use parking_lot::Mutex;

use super::codec::ChunkFramer;
use super::error::{BoltError, TransportError};
use super::handshake::{is_preamble, HANDSHAKE_SIZE};
use super::message::{encode_message, BoltRequest, BoltResponse};
use super::packstream::decode_exact;

/// A blocking, ordered byte stream to a single server.
pub trait Transport: Send {
    /// Open the underlying connection.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Drop the current connection (if any) and open a new one.
    fn reconnect(&mut self) -> Result<(), TransportError> {
        if self.is_connected() {
            self.close()?;
        }
        self.connect()
    }

    /// Read exactly `n` bytes, blocking until they arrive.
    fn read(&mut self, n: usize) -> Result<Bytes, TransportError>;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Whether the connection is currently open.
    fn is_connected(&self) -> bool;

    /// Close the connection. Closing a closed transport is a no-op.
    fn close(&mut self) -> Result<(), TransportError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    inbound: BytesMut,
    outbound: BytesMut,
    connected: bool,
    connects: usize,
    fail_connect: bool,
}

/// In-memory transport with a scripted inbound stream.
///
/// Clones share state, so a test can keep one handle while the driver owns
/// another. Bytes queued with [`feed`](Self::feed) are returned by `read`;
/// everything written is captured for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// Create a disconnected transport with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that is already connected.
    pub fn connected() -> Self {
        let transport = Self::new();
        transport.state.lock().connected = true;
        transport
    }

    /// Queue raw bytes for the client to read.
    pub fn feed(&self, bytes: &[u8]) {
        self.state.lock().inbound.extend_from_slice(bytes);
    }

    /// Queue a handshake reply agreeing on `version` (0 for none).
    pub fn feed_handshake(&self, version: u32) {
        self.feed(&version.to_be_bytes());
    }

    /// Queue a framed response message.
    pub fn feed_response(&self, response: &BoltResponse) -> Result<(), BoltError> {
        let body = encode_message(&response.to_structure())?;
        let mut framed = BytesMut::new();
        ChunkFramer::new().frame(&body, &mut framed);
        self.feed(&framed);
        Ok(())
    }

    /// Queue several framed responses in order.
    pub fn feed_responses<'a>(
        &self,
        responses: impl IntoIterator<Item = &'a BoltResponse>,
    ) -> Result<(), BoltError> {
        for response in responses {
            self.feed_response(response)?;
        }
        Ok(())
    }

    /// Number of queued bytes not yet read.
    pub fn pending(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// Everything written so far.
    pub fn written(&self) -> Bytes {
        self.state.lock().outbound.clone().freeze()
    }

    /// Discard the captured output.
    pub fn clear_written(&self) {
        self.state.lock().outbound.clear();
    }

    /// Decode the captured output as a sequence of request messages.
    ///
    /// A leading handshake preamble is skipped.
    pub fn written_requests(&self) -> Result<Vec<BoltRequest>, BoltError> {
        let mut written = self.written();
        if is_preamble(&written) {
            written.advance(HANDSHAKE_SIZE);
        }

        let mut replay = MemoryTransport::connected();
        replay.feed(&written);

        let framer = ChunkFramer::new();
        let mut requests = Vec::new();
        while replay.pending() > 0 {
            let message = framer.receive(&mut replay)?;
            if message.is_empty() {
                continue;
            }
            let value = decode_exact(&message)?;
            let structure = value
                .as_structure()
                .ok_or_else(|| BoltError::Protocol("Expected structure".to_string()))?;
            requests.push(BoltRequest::from_structure(structure)?);
        }
        Ok(requests)
    }

    /// How many times `connect` succeeded.
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Make every later `connect` fail with connection refused.
    pub fn fail_connections(&self) {
        self.state.lock().fail_connect = true;
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_connect {
            return Err(TransportError::Connect {
                address: "memory".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ),
            });
        }
        state.connected = true;
        state.connects += 1;
        Ok(())
    }

    fn read(&mut self, n: usize) -> Result<Bytes, TransportError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.inbound.len() < n {
            // A real socket would block forever; report end of stream instead.
            state.inbound.clear();
            return Err(TransportError::UnexpectedEof { expected: n });
        }
        Ok(state.inbound.split_to(n).freeze())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        state.outbound.extend_from_slice(data);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().connected = false;
        Ok(())
    }
}
