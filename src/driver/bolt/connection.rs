//! Bolt transports for client-side use.
//!
//! [`TcpTransport`] is the blocking socket the driver uses by default;
//! [`TransportFactory`] lets the driver open one transport per server
//! address (default and leader) without knowing how bytes move.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::bolt::error::TransportError;
use crate::bolt::transport::{MemoryTransport, Transport};
use crate::driver::driver::{DriverConfig, ServerAddress};

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking TCP transport.
///
/// Construction does no I/O; the socket is opened by [`Transport::connect`]
/// (the handshake connects on first use).
#[derive(Debug)]
pub struct TcpTransport {
    /// Server address
    address: ServerAddress,
    /// Timeout for each resolved address
    connect_timeout: Duration,
    /// Read/write timeout, `None` blocks forever
    socket_timeout: Option<Duration>,
    /// Open stream
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create an unconnected transport.
    pub fn new(address: ServerAddress) -> Self {
        Self {
            address,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            socket_timeout: None,
            stream: None,
        }
    }

    /// Set connect and socket timeouts.
    pub fn with_timeouts(mut self, connect: Duration, socket: Option<Duration>) -> Self {
        self.connect_timeout = connect;
        self.socket_timeout = socket;
        self
    }

    /// Server address.
    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    fn open(&self, target: &str) -> Result<TcpStream, TransportError> {
        let connect_error = |source: io::Error| TransportError::Connect {
            address: target.to_string(),
            source,
        };

        let mut last_error = None;
        for addr in target.to_socket_addrs().map_err(connect_error)? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    // Enable TCP nodelay for lower latency
                    stream.set_nodelay(true)?;
                    stream.set_read_timeout(self.socket_timeout)?;
                    stream.set_write_timeout(self.socket_timeout)?;
                    return Ok(stream);
                }
                Err(e) => {
                    trace!(%addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(connect_error(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing")
        })))
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let target = self.address.to_socket_addr();
        let stream = self.open(&target)?;
        debug!(address = %target, "TCP connection established");
        self.stream = Some(stream);
        Ok(())
    }

    fn read(&mut self, n: usize) -> Result<Bytes, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let mut buf = vec![0u8; n];
        match stream.read_exact(&mut buf) {
            Ok(()) => Ok(Bytes::from(buf)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(TransportError::UnexpectedEof { expected: n })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        debug!(address = %self.address, "Closing TCP connection");
        match stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // peer already hung up
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Transport factories
// ============================================================================

/// Creates one transport per server address.
pub trait TransportFactory: Send + Sync {
    /// Create an (unconnected) transport for `address`.
    fn create(&self, address: &ServerAddress) -> Result<Box<dyn Transport>, TransportError>;
}

/// Factory for [`TcpTransport`].
#[derive(Debug, Clone)]
pub struct TcpTransportFactory {
    connect_timeout: Duration,
    socket_timeout: Option<Duration>,
}

impl TcpTransportFactory {
    /// Create a factory with explicit timeouts.
    pub fn new(connect_timeout: Duration, socket_timeout: Option<Duration>) -> Self {
        Self {
            connect_timeout,
            socket_timeout,
        }
    }

    /// Take timeouts from a driver configuration.
    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(config.connection_timeout, config.socket_timeout)
    }
}

impl Default for TcpTransportFactory {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, None)
    }
}

impl TransportFactory for TcpTransportFactory {
    fn create(&self, address: &ServerAddress) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(
            TcpTransport::new(address.clone())
                .with_timeouts(self.connect_timeout, self.socket_timeout),
        ))
    }
}

#[derive(Debug, Default)]
struct MemoryRegistry {
    transports: HashMap<ServerAddress, MemoryTransport>,
    created: Vec<ServerAddress>,
}

/// Factory handing out pre-registered [`MemoryTransport`]s.
///
/// Clones share the registry, so a test can script servers through one
/// handle and give another to the driver.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransportFactory {
    inner: Arc<Mutex<MemoryRegistry>>,
}

impl MemoryTransportFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the transport returned for `address`.
    pub fn register(&self, address: ServerAddress, transport: MemoryTransport) {
        self.inner.lock().transports.insert(address, transport);
    }

    /// Registered transport for `address`.
    pub fn transport(&self, address: &ServerAddress) -> Option<MemoryTransport> {
        self.inner.lock().transports.get(address).cloned()
    }

    /// Addresses a transport was created for, in order.
    pub fn created(&self) -> Vec<ServerAddress> {
        self.inner.lock().created.clone()
    }
}

impl TransportFactory for MemoryTransportFactory {
    fn create(&self, address: &ServerAddress) -> Result<Box<dyn Transport>, TransportError> {
        let mut inner = self.inner.lock();
        let transport = inner
            .transports
            .get(address)
            .cloned()
            .ok_or_else(|| TransportError::Connect {
                address: address.to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "no such server"),
            })?;
        inner.created.push(address.clone());
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_tcp_transport_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let peer = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).unwrap();
            socket.write_all(&buf).unwrap();
        });

        let mut transport = TcpTransport::new(ServerAddress::new("127.0.0.1", port))
            .with_timeouts(Duration::from_secs(5), Some(Duration::from_secs(5)));
        assert!(!transport.is_connected());
        assert!(matches!(transport.read(1), Err(TransportError::NotConnected)));

        transport.connect().unwrap();
        assert!(transport.is_connected());
        transport.write(&[0x60, 0x60, 0xB0, 0x17]).unwrap();
        assert_eq!(&transport.read(4).unwrap()[..], &[0x60, 0x60, 0xB0, 0x17]);

        peer.join().unwrap();
        // peer closed the socket
        assert!(matches!(
            transport.read(2),
            Err(TransportError::UnexpectedEof { expected: 2 })
        ));

        transport.close().unwrap();
        assert!(!transport.is_connected());
        transport.close().unwrap();
    }

    #[test]
    fn test_tcp_connect_refused() {
        // bind then drop to get a free port with nothing listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let mut transport = TcpTransport::new(ServerAddress::new("127.0.0.1", port))
            .with_timeouts(Duration::from_secs(1), None);
        let err = transport.connect().unwrap_err();
        assert!(matches!(err, TransportError::Connect { ref address, .. } if address.ends_with(&port.to_string())));
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_memory_factory() {
        let factory = MemoryTransportFactory::new();
        let address = ServerAddress::new("a", 7687);
        let server = MemoryTransport::connected();
        factory.register(address.clone(), server.clone());

        let mut transport = factory.create(&address).unwrap();
        transport.write(b"hi").unwrap();
        assert_eq!(&server.written()[..], b"hi");
        assert_eq!(factory.created(), vec![address]);

        let missing = factory.create(&ServerAddress::new("b", 7687));
        assert!(matches!(missing, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_tcp_factory_creates_unconnected() {
        let factory = TcpTransportFactory::default();
        let transport = factory.create(&ServerAddress::new("localhost", 7687)).unwrap();
        assert!(!transport.is_connected());
    }
}
