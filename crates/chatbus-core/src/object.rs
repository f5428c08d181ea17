use crate::accessor::PropertyAccessor;
use crate::dispatcher::{Invocation, MethodDispatcher};
use crate::emitter::{EmitError, SignalEmitter, SignalSink};
use crate::store::PropertyStore;
use chatbus_schema::{failed_error_name, ErrorName, InterfaceDescriptor, Value, TEST_INTERFACE};
use std::sync::Arc;
use thiserror::Error;

/// Failure of a single method call or property access. Each variant maps to the
/// D-Bus error name returned to the caller.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("Unsupported method call")]
    UnsupportedMethod { method: String },
    #[error("No such property '{0}'")]
    UnknownProperty(String),
    #[error("Property '{0}' is read-only")]
    PropertyReadOnly(String),
    #[error("Property '{property}' has type '{expected}', got '{found}'")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: String,
    },
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("Signal emission failed: {0}")]
    Emission(#[from] EmitError),
}

impl ObjectError {
    /// Error identifier for a failure raised on `interface`.
    pub fn error_name(&self, interface: &str) -> ErrorName {
        match self {
            ObjectError::UnsupportedMethod { .. } | ObjectError::Emission(_) => {
                ErrorName::new(failed_error_name(interface))
            }
            ObjectError::UnknownProperty(_) => ErrorName::new(ErrorName::UNKNOWN_PROPERTY),
            ObjectError::PropertyReadOnly(_) => ErrorName::new(ErrorName::PROPERTY_READ_ONLY),
            ObjectError::TypeMismatch { .. } | ObjectError::InvalidArgs(_) => {
                ErrorName::new(ErrorName::INVALID_ARGS)
            }
        }
    }
}

/// The exported object: `TestInterface` methods plus its `Title` property.
pub struct TestObject<S> {
    path: String,
    descriptor: &'static InterfaceDescriptor,
    methods: MethodDispatcher<S>,
    properties: PropertyAccessor<S>,
}

impl<S: SignalSink> TestObject<S> {
    pub fn new(path: impl Into<String>, sink: S) -> Self {
        let path = path.into();
        let emitter = Arc::new(SignalEmitter::new(sink, path.clone(), TEST_INTERFACE.name));
        Self {
            path,
            descriptor: &TEST_INTERFACE,
            methods: MethodDispatcher::new(Arc::clone(&emitter)),
            properties: PropertyAccessor::new(&TEST_INTERFACE, PropertyStore::default(), emitter),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn descriptor(&self) -> &'static InterfaceDescriptor {
        self.descriptor
    }

    pub fn interface(&self) -> &'static str {
        self.descriptor.name
    }

    pub async fn call_method(&self, call: &Invocation) -> Result<Vec<Value>, ObjectError> {
        self.methods.dispatch(call).await
    }

    pub async fn get_property(&self, name: &str) -> Option<Value> {
        self.properties.get(name).await
    }

    pub async fn get_all_properties(&self) -> Vec<(String, Value)> {
        self.properties.get_all().await
    }

    pub async fn set_property(&self, name: &str, value: Value) -> Result<bool, ObjectError> {
        self.properties.set(name, value).await
    }
}
