//! D-Bus service for chatbus.
//!
//! This crate exports the chatbus `TestObject` at `/io/starnight/dbus_test/TestObject`
//! under the well-known name `io.starnight.dbus_test.TestServer`. Inbound method
//! calls are read straight off the connection's message stream, decoded into core
//! requests, routed by object path and interface (including the standard
//! `Properties`, `Introspectable` and `Peer` interfaces), and answered with exactly
//! one reply each. Losing the well-known name stops the service with an error.

pub mod config;
pub mod router;
pub mod service;
pub mod sink;
pub mod wire;

pub use config::{BusKind, ConfigError, ServiceConfig};
pub use router::{BusError, Reply, Request, Router};
pub use service::{run_service, Service, ServiceError};
pub use sink::BusSignalSink;
