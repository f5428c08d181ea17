use crate::wire::to_wire_value;
use chatbus_core::{EmitError, Signal, SignalSink};
use std::collections::HashMap;
use tracing::warn;
use zbus::names::BusName;
use zbus::zvariant;
use zbus::Connection;

/// Broadcasts signals on a live bus connection.
#[derive(Clone)]
pub struct BusSignalSink {
    conn: Connection,
}

impl BusSignalSink {
    pub fn new(conn: &Connection) -> Self {
        Self { conn: conn.clone() }
    }
}

impl SignalSink for BusSignalSink {
    async fn emit(&self, path: &str, signal: &Signal) -> Result<(), EmitError> {
        let sent = match signal {
            Signal::MsgNotification {
                interface,
                sender,
                msg,
            } => {
                self.conn
                    .emit_signal(
                        None::<BusName<'_>>,
                        path,
                        interface.as_str(),
                        signal.member(),
                        &(sender.as_str(), msg.as_str()),
                    )
                    .await
            }
            Signal::PropertiesChanged {
                changed_interface,
                changed,
                invalidated,
            } => {
                let mut values: HashMap<&str, zvariant::Value<'static>> = HashMap::new();
                for (name, value) in changed {
                    match to_wire_value(value) {
                        Some(wire) => {
                            values.insert(name.as_str(), wire);
                        }
                        None => warn!("not announcing {name}: unsupported value type"),
                    }
                }
                let invalidated: Vec<&str> = invalidated.iter().map(String::as_str).collect();
                self.conn
                    .emit_signal(
                        None::<BusName<'_>>,
                        path,
                        signal.interface(),
                        signal.member(),
                        &(changed_interface.as_str(), values, invalidated),
                    )
                    .await
            }
        };
        sent.map_err(|e| match e {
            zbus::Error::InputOutput(_) => EmitError::Disconnected,
            other => EmitError::Transport(other.to_string()),
        })
    }
}
