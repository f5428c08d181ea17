//! Routing of decoded bus requests to exported objects.
//!
//! The router is transport-free: [`crate::wire`] turns messages into [`Request`]s
//! and sends whatever [`Router::route`] returns as the single reply.

use chatbus_core::{CoreError, Invocation, ObjectError, ObjectRegistry, RegistrationHandle};
use chatbus_core::{SignalSink, TestObject};
use chatbus_schema::{introspect_node, ErrorName, InterfaceDescriptor, Value};
use tracing::debug;

/// A method call after decoding, classified by what it asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Method(Invocation),
    GetProperty {
        interface: String,
        name: String,
    },
    GetAllProperties {
        interface: String,
    },
    SetProperty {
        interface: String,
        name: String,
        value: Value,
    },
    Introspect,
    Ping,
    /// A member of a standard interface this router does not implement.
    UnknownMember {
        interface: String,
        member: String,
    },
    /// The body did not match the member's signature.
    Invalid(String),
}

/// Payload of a successful reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Method outputs, in declaration order. Empty for no payload.
    Values(Vec<Value>),
    /// A single variant, as returned by `Properties.Get`.
    Variant(Value),
    /// `a{sv}`, as returned by `Properties.GetAll`.
    Properties(Vec<(String, Value)>),
    Xml(String),
}

impl Reply {
    pub fn empty() -> Self {
        Reply::Values(Vec::new())
    }
}

/// An error reply: identifier plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusError {
    pub name: ErrorName,
    pub message: String,
}

impl BusError {
    pub fn new(name: impl Into<ErrorName>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn from_object(err: &ObjectError, interface: &str) -> Self {
        Self::new(err.error_name(interface), err.to_string())
    }

    fn unknown_interface(interface: &str) -> Self {
        Self::new(
            ErrorName::UNKNOWN_INTERFACE,
            format!("No such interface '{interface}'"),
        )
    }
}

/// The objects exported on one connection and the routing between them.
pub struct Router<S> {
    registry: ObjectRegistry<TestObject<S>>,
}

impl<S> Default for Router<S> {
    fn default() -> Self {
        Self {
            registry: ObjectRegistry::new(),
        }
    }
}

impl<S: SignalSink> Router<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, object: TestObject<S>) -> Result<RegistrationHandle, CoreError> {
        let path = object.path().to_owned();
        self.registry.register(&path, object)
    }

    pub fn unregister(&mut self, handle: RegistrationHandle) -> Result<TestObject<S>, CoreError> {
        self.registry.unregister(handle)
    }

    pub fn object(&self, path: &str) -> Option<&TestObject<S>> {
        self.registry.get(path)
    }

    pub fn descriptor_at(&self, path: &str) -> Option<&'static InterfaceDescriptor> {
        self.registry.get(path).map(TestObject::descriptor)
    }

    /// Produce the one outcome for a request addressed to `path`.
    pub async fn route(&self, path: &str, request: Request) -> Result<Reply, BusError> {
        match request {
            Request::Introspect => self.introspect(path),
            Request::Invalid(detail) => Err(BusError::new(ErrorName::INVALID_ARGS, detail)),
            Request::Ping => self.object_at(path).map(|_| Reply::empty()),
            Request::UnknownMember { interface, member } => {
                self.object_at(path)?;
                Err(BusError::new(
                    ErrorName::UNKNOWN_METHOD,
                    format!("No such method '{member}' on interface '{interface}'"),
                ))
            }
            Request::Method(call) => {
                let object = self.object_at(path)?;
                let own = object.interface();
                if call.interface != own {
                    return Err(BusError::unknown_interface(&call.interface));
                }
                object
                    .call_method(&call)
                    .await
                    .map(Reply::Values)
                    .map_err(|e| BusError::from_object(&e, own))
            }
            Request::GetProperty { interface, name } => {
                let object = self.object_at(path)?;
                let own = object.interface();
                check_interface(own, &interface)?;
                object.get_property(&name).await.map(Reply::Variant).ok_or_else(|| {
                    BusError::from_object(&ObjectError::UnknownProperty(name), own)
                })
            }
            Request::GetAllProperties { interface } => {
                let object = self.object_at(path)?;
                check_interface(object.interface(), &interface)?;
                Ok(Reply::Properties(object.get_all_properties().await))
            }
            Request::SetProperty {
                interface,
                name,
                value,
            } => {
                let object = self.object_at(path)?;
                let own = object.interface();
                check_interface(own, &interface)?;
                match object.set_property(&name, value).await {
                    Ok(true) => Ok(Reply::empty()),
                    Ok(false) => {
                        let err = if object.descriptor().property(&name).is_some() {
                            ObjectError::PropertyReadOnly(name)
                        } else {
                            ObjectError::UnknownProperty(name)
                        };
                        Err(BusError::from_object(&err, own))
                    }
                    Err(e) => Err(BusError::from_object(&e, own)),
                }
            }
        }
    }

    fn object_at(&self, path: &str) -> Result<&TestObject<S>, BusError> {
        self.registry.get(path).ok_or_else(|| {
            debug!("call to unknown object {path}");
            BusError::new(
                ErrorName::UNKNOWN_OBJECT,
                format!("No such object path '{path}'"),
            )
        })
    }

    fn introspect(&self, path: &str) -> Result<Reply, BusError> {
        let children = self.registry.child_nodes(path);
        match self.registry.get(path) {
            Some(object) => Ok(Reply::Xml(introspect_node(&[object.descriptor()], &children))),
            None if !children.is_empty() || path == "/" => {
                Ok(Reply::Xml(introspect_node(&[], &children)))
            }
            None => Err(BusError::new(
                ErrorName::UNKNOWN_OBJECT,
                format!("No such object path '{path}'"),
            )),
        }
    }
}

/// `Properties` calls may leave the interface empty to mean "whichever has it".
fn check_interface(own: &str, requested: &str) -> Result<(), BusError> {
    if requested.is_empty() || requested == own {
        Ok(())
    } else {
        Err(BusError::unknown_interface(requested))
    }
}
