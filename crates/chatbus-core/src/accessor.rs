use crate::emitter::{SignalEmitter, SignalSink};
use crate::object::ObjectError;
use crate::store::PropertyStore;
use chatbus_schema::{ArgType, InterfaceDescriptor, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Name-routed reads and writes of the object's properties.
///
/// The accessor is the only writer of its [`PropertyStore`]. A write keeps the
/// store locked until its `PropertiesChanged` has been handed to the sink, so
/// notifications go out in the same order the writes were committed.
pub struct PropertyAccessor<S> {
    descriptor: &'static InterfaceDescriptor,
    store: PropertyStore,
    emitter: Arc<SignalEmitter<S>>,
}

impl<S: SignalSink> PropertyAccessor<S> {
    pub fn new(
        descriptor: &'static InterfaceDescriptor,
        store: PropertyStore,
        emitter: Arc<SignalEmitter<S>>,
    ) -> Self {
        Self {
            descriptor,
            store,
            emitter,
        }
    }

    /// Current value of `name`, or `None` if no readable property has that name.
    pub async fn get(&self, name: &str) -> Option<Value> {
        let spec = self.descriptor.property(name)?;
        if !spec.access.readable() {
            return None;
        }
        self.store.read(name).await.map(Value::Str)
    }

    /// Every readable property, in declaration order.
    pub async fn get_all(&self) -> Vec<(String, Value)> {
        let mut entries = self.store.lock().await;
        self.descriptor
            .properties
            .iter()
            .filter(|spec| spec.access.readable())
            .filter_map(|spec| {
                let entry = entries.get_mut(spec.name)?;
                Some((spec.name.to_owned(), Value::Str(entry.get_or_init().to_owned())))
            })
            .collect()
    }

    /// Write `value` to `name`.
    ///
    /// Returns `Ok(false)` without touching the store when no writable property has
    /// that name. If the change notification fails the new value stays in place
    /// and the failure is returned.
    pub async fn set(&self, name: &str, value: Value) -> Result<bool, ObjectError> {
        let Some(spec) = self.descriptor.property(name) else {
            debug!("rejecting write to unknown property {name}");
            return Ok(false);
        };
        if !spec.access.writable() {
            debug!("rejecting write to read-only property {name}");
            return Ok(false);
        }
        let new_value = match value {
            Value::Str(s) if spec.ty == ArgType::Str => s,
            other => {
                return Err(ObjectError::TypeMismatch {
                    property: name.to_owned(),
                    expected: spec.ty.signature(),
                    found: other.signature().to_owned(),
                });
            }
        };

        let mut entries = self.store.lock().await;
        let Some(entry) = entries.get_mut(spec.name) else {
            return Ok(false);
        };
        entry.replace(new_value.clone());
        info!("{name} set to {new_value:?}");

        self.emitter
            .properties_changed(spec.name, Value::Str(new_value))
            .await?;
        drop(entries);
        Ok(true)
    }
}
