//! Signal emission.
//!
//! Handlers describe a notification as a [`Signal`] and hand it to a
//! [`SignalEmitter`], which stamps the object path and forwards it to a
//! [`SignalSink`]. Emission is fire-and-forget: a sink reports whether the signal
//! left the process, never whether any subscriber saw it.

use chatbus_schema::{Value, PROPERTIES_INTERFACE};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("bus connection unavailable")]
    Disconnected,
    #[error("signal transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// `MsgNotification(sender, msg)` on the exported interface.
    MsgNotification {
        interface: String,
        sender: String,
        msg: String,
    },
    /// Standard `PropertiesChanged` for properties of `changed_interface`.
    PropertiesChanged {
        changed_interface: String,
        changed: Vec<(String, Value)>,
        invalidated: Vec<String>,
    },
}

impl Signal {
    /// Interface the signal itself is emitted on.
    pub fn interface(&self) -> &str {
        match self {
            Signal::MsgNotification { interface, .. } => interface,
            Signal::PropertiesChanged { .. } => PROPERTIES_INTERFACE,
        }
    }

    pub fn member(&self) -> &'static str {
        match self {
            Signal::MsgNotification { .. } => "MsgNotification",
            Signal::PropertiesChanged { .. } => "PropertiesChanged",
        }
    }
}

/// Transport half of signal emission: broadcasts one signal from `path` with no
/// specific destination.
pub trait SignalSink: Send + Sync {
    fn emit(
        &self,
        path: &str,
        signal: &Signal,
    ) -> impl Future<Output = Result<(), EmitError>> + Send;
}

impl<S: SignalSink> SignalSink for Arc<S> {
    fn emit(
        &self,
        path: &str,
        signal: &Signal,
    ) -> impl Future<Output = Result<(), EmitError>> + Send {
        (**self).emit(path, signal)
    }
}

/// Builds the object's signals and sends them through a sink.
pub struct SignalEmitter<S> {
    sink: S,
    path: String,
    interface: &'static str,
}

impl<S: SignalSink> SignalEmitter<S> {
    pub fn new(sink: S, path: impl Into<String>, interface: &'static str) -> Self {
        Self {
            sink,
            path: path.into(),
            interface,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn msg_notification(&self, sender: &str, msg: &str) -> Result<(), EmitError> {
        self.emit(Signal::MsgNotification {
            interface: self.interface.to_owned(),
            sender: sender.to_owned(),
            msg: msg.to_owned(),
        })
        .await
    }

    /// Announce that exactly one property changed to `value`.
    pub async fn properties_changed(&self, name: &str, value: Value) -> Result<(), EmitError> {
        self.emit(Signal::PropertiesChanged {
            changed_interface: self.interface.to_owned(),
            changed: vec![(name.to_owned(), value)],
            invalidated: Vec::new(),
        })
        .await
    }

    async fn emit(&self, signal: Signal) -> Result<(), EmitError> {
        debug!("emitting {}.{} on {}", signal.interface(), signal.member(), self.path);
        self.sink.emit(&self.path, &signal).await.map_err(|e| {
            warn!("{} emission failed on {}: {e}", signal.member(), self.path);
            e
        })
    }
}

/// In-memory sink that records every signal, for driving objects without a bus.
///
/// Failure can be injected with [`RecordingSink::set_failing`]; a failing sink
/// records nothing and reports [`EmitError::Disconnected`].
#[derive(Default)]
pub struct RecordingSink {
    emitted: Mutex<Vec<(String, Signal)>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Recorded `(path, signal)` pairs in emission order.
    pub fn emitted(&self) -> Vec<(String, Signal)> {
        self.emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.emitted().into_iter().map(|(_, s)| s).collect()
    }

    pub fn len(&self) -> usize {
        self.emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignalSink for RecordingSink {
    async fn emit(&self, path: &str, signal: &Signal) -> Result<(), EmitError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmitError::Disconnected);
        }
        self.emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_owned(), signal.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbus_schema::{INTERFACE_NAME, OBJECT_PATH};

    fn emitter() -> (Arc<RecordingSink>, SignalEmitter<Arc<RecordingSink>>) {
        let sink = Arc::new(RecordingSink::new());
        let emitter = SignalEmitter::new(Arc::clone(&sink), OBJECT_PATH, INTERFACE_NAME);
        (sink, emitter)
    }

    #[tokio::test]
    async fn msg_notification_carries_sender_then_msg() {
        let (sink, emitter) = emitter();
        emitter.msg_notification(":1.7", "hello").await.unwrap();

        let emitted = sink.emitted();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].0, OBJECT_PATH);
        assert_eq!(
            emitted[0].1,
            Signal::MsgNotification {
                interface: INTERFACE_NAME.to_owned(),
                sender: ":1.7".to_owned(),
                msg: "hello".to_owned(),
            }
        );
        assert_eq!(emitted[0].1.interface(), INTERFACE_NAME);
        assert_eq!(emitted[0].1.member(), "MsgNotification");
    }

    #[tokio::test]
    async fn properties_changed_has_one_entry_and_no_invalidations() {
        let (sink, emitter) = emitter();
        emitter
            .properties_changed("Title", Value::from("new"))
            .await
            .unwrap();

        let signal = &sink.signals()[0];
        assert_eq!(signal.interface(), PROPERTIES_INTERFACE);
        assert_eq!(signal.member(), "PropertiesChanged");
        match signal {
            Signal::PropertiesChanged {
                changed_interface,
                changed,
                invalidated,
            } => {
                assert_eq!(changed_interface, INTERFACE_NAME);
                assert_eq!(changed, &[("Title".to_owned(), Value::from("new"))]);
                assert!(invalidated.is_empty());
            }
            other => panic!("unexpected signal {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_sink_reports_and_records_nothing() {
        let (sink, emitter) = emitter();
        sink.set_failing(true);
        let err = emitter.msg_notification(":1.7", "lost").await.unwrap_err();
        assert_eq!(err, EmitError::Disconnected);
        assert!(sink.is_empty());

        sink.set_failing(false);
        emitter.msg_notification(":1.7", "sent").await.unwrap();
        assert_eq!(sink.len(), 1);
    }
}
