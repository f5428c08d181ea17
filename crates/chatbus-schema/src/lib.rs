//! Bus identity, interface schema, and value vocabulary for chatbus.
//!
//! This crate defines the schema layer: the fixed bus identity (well-known name,
//! object path, interface name), the static `TestInterface` descriptor with its
//! methods, signals and properties, the typed [`Value`] set the core exchanges with
//! the bus layer, and introspection XML generated from descriptors.

pub mod descriptor;
pub mod identity;
pub mod introspect;
pub mod types;
pub mod value;

pub use descriptor::{
    Access, Arg, InterfaceDescriptor, MethodSpec, PropertySpec, SignalSpec, TEST_INTERFACE,
};
pub use identity::{
    failed_error_name, validate_object_path, BUS_NAME, INTERFACE_NAME, INTROSPECTABLE_INTERFACE,
    OBJECT_PATH, PEER_INTERFACE, PROPERTIES_INTERFACE, TITLE_DEFAULT,
};
pub use introspect::introspect_node;
pub use types::{ErrorName, SenderId};
pub use value::{ArgType, Value};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid object path '{0}'")]
    InvalidObjectPath(String),
    #[error("interface {interface}: empty {kind} name")]
    EmptyMember {
        interface: String,
        kind: &'static str,
    },
    #[error("interface {interface}: duplicate {kind} '{name}'")]
    DuplicateMember {
        interface: String,
        kind: &'static str,
        name: String,
    },
}
