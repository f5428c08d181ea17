//! Object dispatch and property-change protocol for chatbus.
//!
//! This crate holds everything between a decoded bus request and its reply: the
//! `Title` property store, the method dispatcher for `Login` and `SendMsg`, the
//! property accessor, signal emission through a pluggable [`SignalSink`], the
//! name-ownership state machine, and the per-connection object registry. It knows
//! nothing about the wire; the `chatbus-dbus` crate adapts it to a live bus.

pub mod accessor;
pub mod dispatcher;
pub mod emitter;
pub mod lifecycle;
pub mod object;
pub mod registry;
pub mod store;

pub use accessor::PropertyAccessor;
pub use dispatcher::{Invocation, MethodDispatcher};
pub use emitter::{EmitError, RecordingSink, Signal, SignalEmitter, SignalSink};
pub use lifecycle::{validate_transition, LifecycleController, NameEvent, OwnershipState};
pub use object::{ObjectError, TestObject};
pub use registry::{ObjectRegistry, RegistrationHandle};
pub use store::{PropertyEntry, PropertyStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("schema error: {0}")]
    Schema(#[from] chatbus_schema::SchemaError),
    #[error("invalid ownership transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("an object is already registered at {0}")]
    AlreadyRegistered(String),
    #[error("no matching registration at {0}")]
    NotRegistered(String),
}
