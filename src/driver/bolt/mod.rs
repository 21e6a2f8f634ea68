//! Bolt connections for the driver.
//!
//! The protocol layer in [`crate::bolt`] only sees a [`Transport`]; this
//! module supplies the concrete transports and the factory the driver uses
//! to open one per server address.
//!
//! ```text
//! Driver
//!   ├── default Endpoint ── SessionRegistry ── Session ── TcpTransport
//!   └── leader Endpoint  ── SessionRegistry ── Session ── TcpTransport
//! ```
//!
//! [`Transport`]: crate::bolt::transport::Transport

pub mod connection;

pub use connection::{
    MemoryTransportFactory, TcpTransport, TcpTransportFactory, TransportFactory,
    DEFAULT_CONNECT_TIMEOUT,
};

/// Default Bolt port.
pub const DEFAULT_PORT: u16 = 7687;

/// Client user agent string.
pub fn user_agent() -> String {
    format!("bolt-driver/{}", env!("CARGO_PKG_VERSION"))
}
