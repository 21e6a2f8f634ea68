//! # Bolt Driver
//!
//! A blocking Rust client driver for graph databases that speak the
//! Bolt v1 protocol.
//!
//! ## Features
//!
//! - **Bolt v1** - Version handshake, chunked message framing and the full
//!   INIT / RUN / PULL_ALL / DISCARD_ALL / ACK_FAILURE / RESET exchange
//! - **PackStream** - Canonical (smallest tier) encoding, lenient decoding
//! - **Sessions** - A strict one-request-at-a-time state machine with
//!   recoverable server failures
//! - **Causal clusters** - Topology discovery and write routing to a leader
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use bolt_driver::{params, AuthToken, Driver};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create driver (no I/O yet)
//!     let mut driver = Driver::new(
//!         "bolt://localhost:7687",
//!         AuthToken::basic("neo4j", "password"),
//!     )?;
//!
//!     // Handshake and INIT happen on first use
//!     let session = driver.session()?;
//!
//!     // Run query with parameters
//!     let records = session
//!         .run("MATCH (n:Person {name: $name}) RETURN n.age AS age", Some(params! {"name" => "Alice"}))?
//!         .list()?;
//!
//!     for record in &records {
//!         println!("{}", record.get_int("age")?);
//!     }
//!
//!     driver.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Failures
//!
//! A server `FAILURE` leaves the connection usable once acknowledged:
//!
//! ```rust,no_run
//! # use bolt_driver::{AuthToken, Driver, DriverError};
//! # fn example() -> Result<(), DriverError> {
//! # let mut driver = Driver::new("bolt://localhost:7687", AuthToken::none())?;
//! let session = driver.session()?;
//! let outcome = session.run("RETRUN 1", None).and_then(|result| result.consume());
//! match outcome {
//!     Err(DriverError::Failure(failure)) => {
//!         eprintln!("{}: {}", failure.code, failure.message);
//!         session.ack_failure()?;
//!     }
//!     Err(e) => return Err(e),
//!     Ok(summary) => println!("{:?}", summary.query_type),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Customize driver behavior with [`DriverConfig`]:
//!
//! ```rust
//! use bolt_driver::{AuthToken, DriverConfig};
//! use std::time::Duration;
//!
//! let config = DriverConfig::builder("bolt://localhost:7687", AuthToken::basic("u", "p"))
//!     .unwrap()
//!     .with_connection_timeout(Duration::from_secs(10))
//!     .with_socket_timeout(Duration::from_secs(60))
//!     .with_cluster_discovery(false)
//!     .build();
//! assert_eq!(config.address.port, 7687);
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Driver, sessions, records and cluster routing
//! - [`bolt`] - Low-level Bolt protocol implementation
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod driver;

// Re-exports for convenience
pub use driver::{
    AuthToken, ConnectionEvent, ConnectionListener, Driver, DriverConfig, DriverConfigBuilder,
    DriverError, DriverResult, QueryResult, Record, ResultSummary, ServerAddress, Session,
    SessionState, Value,
};

pub use bolt::{BoltError, BoltVersion, PackStreamMap, PackStreamValue};

/// Config alias for convenience
pub type Config = DriverConfig;
