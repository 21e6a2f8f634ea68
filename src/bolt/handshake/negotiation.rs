//! Bolt handshake negotiation.

use tracing::debug;

use super::{BoltVersion, HandshakeError, BOLT_MAGIC, HANDSHAKE_RESPONSE_SIZE, HANDSHAKE_SIZE};
use crate::bolt::error::TransportError;
use crate::bolt::transport::Transport;

/// Proposals sent when nothing else is configured: Bolt 1 only.
pub const DEFAULT_PROPOSALS: [u32; 4] = [1, 0, 0, 0];

/// Client side of the Bolt handshake.
///
/// The handshake process:
/// 1. Client sends 20 bytes: 4-byte magic + 4 x 4-byte version proposals
/// 2. Server picks the first proposal it supports
/// 3. Server responds with 4-byte agreed version (or 0x00000000 if none)
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Proposed versions, most preferred first, zero-padded
    proposals: [u32; 4],
}

impl Handshake {
    /// Create a handshake proposing [`DEFAULT_PROPOSALS`].
    pub fn new() -> Self {
        Self::with_proposals(DEFAULT_PROPOSALS)
    }

    /// Create a handshake with explicit proposals.
    pub fn with_proposals(proposals: [u32; 4]) -> Self {
        Self { proposals }
    }

    /// The proposals this handshake sends.
    pub fn proposals(&self) -> [u32; 4] {
        self.proposals
    }

    /// The exact 20 bytes written to the server.
    pub fn request_bytes(&self) -> [u8; HANDSHAKE_SIZE] {
        let mut data = [0u8; HANDSHAKE_SIZE];
        data[0..4].copy_from_slice(&BOLT_MAGIC);
        for (i, version) in self.proposals.iter().enumerate() {
            let offset = 4 + i * 4;
            data[offset..offset + 4].copy_from_slice(&version.to_be_bytes());
        }
        data
    }

    /// Negotiate a protocol version over `transport`.
    ///
    /// Connects the transport first if it is not connected. Any transport
    /// fault is reported as [`HandshakeError::Transport`].
    pub fn negotiate(&self, transport: &mut dyn Transport) -> Result<BoltVersion, HandshakeError> {
        if !transport.is_connected() {
            transport.reconnect().map_err(transport_fault)?;
        }

        debug!(proposals = ?self.proposals, "Sending handshake");
        transport
            .write(&self.request_bytes())
            .map_err(transport_fault)?;

        let reply = transport
            .read(HANDSHAKE_RESPONSE_SIZE)
            .map_err(transport_fault)?;
        let raw = u32::from_be_bytes([reply[0], reply[1], reply[2], reply[3]]);

        match BoltVersion::new(raw) {
            Some(version) => {
                debug!(%version, "Negotiated protocol version");
                Ok(version)
            }
            None => Err(HandshakeError::NoCompatibleVersion {
                proposed: self.proposals,
            }),
        }
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

fn transport_fault(err: TransportError) -> HandshakeError {
    HandshakeError::Transport(err.to_string())
}
