//! Conversion between zbus messages and router requests and replies.

use crate::router::{BusError, Reply, Request};
use chatbus_core::{Invocation, NameEvent};
use chatbus_schema::{
    Arg, ArgType, InterfaceDescriptor, Value, INTERFACE_NAME, INTROSPECTABLE_INTERFACE,
    PEER_INTERFACE, PROPERTIES_INTERFACE,
};
use std::collections::HashMap;
use tracing::{debug, warn};
use zbus::message::{Body, Builder, Flags};
use zbus::zvariant::{self, OwnedValue};
use zbus::{Connection, Message};

const DBUS_NAME: &str = "org.freedesktop.DBus";
const DBUS_PATH: &str = "/org/freedesktop/DBus";
const DBUS_INTERFACE: &str = "org.freedesktop.DBus";
const FAILED: &str = "org.freedesktop.DBus.Error.Failed";

/// Classify a method call addressed to this connection.
///
/// `lookup` returns the interface exported at a path, if any; it decides how a call
/// without an interface field is read and which argument signature is expected.
/// Returns `None` for messages that carry no path or member.
pub fn decode_call(
    msg: &Message,
    lookup: impl Fn(&str) -> Option<&'static InterfaceDescriptor>,
) -> Option<(String, Request)> {
    let header = msg.header();
    let path = header.path()?.as_str().to_owned();
    let member = header.member()?.as_str().to_owned();
    let sender = header
        .sender()
        .map(|s| s.as_str().to_owned())
        .unwrap_or_default();
    let descriptor = lookup(&path);
    let interface = match header.interface() {
        Some(i) => i.as_str().to_owned(),
        None => infer_interface(&member, descriptor),
    };
    let body = msg.body();

    let request = match interface.as_str() {
        PROPERTIES_INTERFACE => decode_properties(&member, &body),
        INTROSPECTABLE_INTERFACE if member == "Introspect" => Request::Introspect,
        PEER_INTERFACE if member == "Ping" => Request::Ping,
        INTROSPECTABLE_INTERFACE | PEER_INTERFACE => Request::UnknownMember { interface, member },
        _ => {
            let inputs = descriptor
                .filter(|d| d.name == interface)
                .and_then(|d| d.method(&member))
                .map_or(&[][..], |m| m.inputs);
            match decode_args(&member, &body, inputs) {
                Ok(args) => Request::Method(
                    Invocation::new(sender, member, args).with_target(path.clone(), interface),
                ),
                Err(detail) => Request::Invalid(detail),
            }
        }
    };
    Some((path, request))
}

fn infer_interface(member: &str, descriptor: Option<&InterfaceDescriptor>) -> String {
    match member {
        "Introspect" => INTROSPECTABLE_INTERFACE.to_owned(),
        "Ping" => PEER_INTERFACE.to_owned(),
        "Get" | "GetAll" | "Set" => PROPERTIES_INTERFACE.to_owned(),
        _ => descriptor.map_or(INTERFACE_NAME, |d| d.name).to_owned(),
    }
}

fn decode_properties(member: &str, body: &Body) -> Request {
    let decoded = match member {
        "Get" => body
            .deserialize::<(String, String)>()
            .map(|(interface, name)| Request::GetProperty { interface, name }),
        "GetAll" => body
            .deserialize::<String>()
            .map(|interface| Request::GetAllProperties { interface }),
        "Set" => body
            .deserialize::<(String, String, OwnedValue)>()
            .map(|(interface, name, value)| Request::SetProperty {
                interface,
                name,
                value: to_core_value(&value),
            }),
        _ => {
            return Request::UnknownMember {
                interface: PROPERTIES_INTERFACE.to_owned(),
                member: member.to_owned(),
            }
        }
    };
    decoded.unwrap_or_else(|e| Request::Invalid(format!("{member}: {e}")))
}

/// Decode a method body against the declared inputs. Calls to undeclared methods
/// carry no arguments forward.
fn decode_args(member: &str, body: &Body, inputs: &[Arg]) -> Result<Vec<Value>, String> {
    let expected: String = inputs.iter().map(|a| a.ty.signature()).collect();
    let found = body.signature().to_string();
    if !inputs.is_empty() && found != expected {
        return Err(format!("{member} expects ({expected}), got ({found})"));
    }
    match inputs {
        [] => Ok(Vec::new()),
        [arg] => decode_one(body, arg.ty)
            .map(|v| vec![v])
            .map_err(|e| format!("{member}: {e}")),
        _ => Err(format!("{member}: multi-argument bodies are not supported")),
    }
}

fn decode_one(body: &Body, ty: ArgType) -> zbus::Result<Value> {
    Ok(match ty {
        ArgType::Str => Value::Str(body.deserialize::<String>()?),
        ArgType::Bool => Value::Bool(body.deserialize::<bool>()?),
        ArgType::I32 => Value::I32(body.deserialize::<i32>()?),
        ArgType::U32 => Value::U32(body.deserialize::<u32>()?),
        ArgType::I64 => Value::I64(body.deserialize::<i64>()?),
        ArgType::U64 => Value::U64(body.deserialize::<u64>()?),
        ArgType::F64 => Value::F64(body.deserialize::<f64>()?),
    })
}

/// Read a wire variant into the core value set. Nested variants are unwrapped.
pub fn to_core_value(value: &zvariant::Value<'_>) -> Value {
    match value {
        zvariant::Value::Str(s) => Value::Str(s.as_str().to_owned()),
        zvariant::Value::Bool(b) => Value::Bool(*b),
        zvariant::Value::I32(n) => Value::I32(*n),
        zvariant::Value::U32(n) => Value::U32(*n),
        zvariant::Value::I64(n) => Value::I64(*n),
        zvariant::Value::U64(n) => Value::U64(*n),
        zvariant::Value::F64(n) => Value::F64(*n),
        zvariant::Value::Value(inner) => to_core_value(inner),
        other => Value::Unsupported(other.value_signature().to_string()),
    }
}

/// The wire form of a core value. `Unsupported` has none.
pub fn to_wire_value(value: &Value) -> Option<zvariant::Value<'static>> {
    Some(match value {
        Value::Str(s) => zvariant::Value::from(s.clone()),
        Value::Bool(b) => zvariant::Value::from(*b),
        Value::I32(n) => zvariant::Value::from(*n),
        Value::U32(n) => zvariant::Value::from(*n),
        Value::I64(n) => zvariant::Value::from(*n),
        Value::U64(n) => zvariant::Value::from(*n),
        Value::F64(n) => zvariant::Value::from(*n),
        Value::Unsupported(_) => return None,
    })
}

fn unsupported(value: &Value) -> zbus::Error {
    zbus::Error::Failure(format!("cannot encode value of type '{}'", value.signature()))
}

fn build_single(builder: Builder<'_>, value: &Value) -> zbus::Result<Message> {
    match value {
        Value::Str(s) => builder.build(&s.as_str()),
        Value::Bool(b) => builder.build(b),
        Value::I32(n) => builder.build(n),
        Value::U32(n) => builder.build(n),
        Value::I64(n) => builder.build(n),
        Value::U64(n) => builder.build(n),
        Value::F64(n) => builder.build(n),
        Value::Unsupported(_) => Err(unsupported(value)),
    }
}

fn build_reply(call: &Message, reply: &Reply) -> zbus::Result<Message> {
    let builder = Message::method_return(&call.header())?;
    match reply {
        Reply::Values(values) => match values.as_slice() {
            [] => builder.build(&()),
            [value] => build_single(builder, value),
            _ => Err(zbus::Error::Failure(
                "multiple output values are not supported".to_owned(),
            )),
        },
        Reply::Variant(value) => {
            let wire = to_wire_value(value).ok_or_else(|| unsupported(value))?;
            builder.build(&wire)
        }
        Reply::Properties(props) => {
            let mut map: HashMap<&str, zvariant::Value<'static>> = HashMap::new();
            for (name, value) in props {
                match to_wire_value(value) {
                    Some(wire) => {
                        map.insert(name.as_str(), wire);
                    }
                    None => warn!("skipping property {name} with unsupported value"),
                }
            }
            builder.build(&map)
        }
        Reply::Xml(xml) => builder.build(&xml.as_str()),
    }
}

fn build_error(call: &Message, err: &BusError) -> zbus::Result<Message> {
    Message::error(&call.header(), err.name.as_str())?.build(&err.message.as_str())
}

/// The one reply owed to an inbound method call. Consumed by [`ReplyHandle::send`].
pub struct ReplyHandle {
    conn: Connection,
    call: Message,
}

impl ReplyHandle {
    pub fn new(conn: &Connection, call: Message) -> Self {
        Self {
            conn: conn.clone(),
            call,
        }
    }

    pub fn expects_reply(&self) -> bool {
        !self
            .call
            .primary_header()
            .flags()
            .contains(Flags::NoReplyExpected)
    }

    /// Send `outcome` to the caller. A success that cannot be encoded becomes a
    /// `Failed` error reply instead.
    pub async fn send(self, outcome: Result<Reply, BusError>) -> zbus::Result<()> {
        if !self.expects_reply() {
            debug!("caller asked for no reply");
            return Ok(());
        }
        let msg = match &outcome {
            Ok(reply) => build_reply(&self.call, reply).or_else(|e| {
                warn!("failed to encode reply: {e}");
                build_error(&self.call, &BusError::new(FAILED, e.to_string()))
            })?,
            Err(err) => {
                debug!("replying with {}: {}", err.name, err.message);
                build_error(&self.call, err)?
            }
        };
        self.conn.send(&msg).await
    }
}

/// Map the bus daemon's `NameAcquired`/`NameLost` for `name` to a lifecycle event.
/// Signals from any other sender or path are ignored.
pub fn name_event(msg: &Message, name: &str) -> Option<NameEvent> {
    let header = msg.header();
    // Only the bus daemon reports ownership changes.
    if header.sender().map(|s| s.as_str()) != Some(DBUS_NAME)
        || header.path().map(|p| p.as_str()) != Some(DBUS_PATH)
        || header.interface().map(|i| i.as_str()) != Some(DBUS_INTERFACE)
    {
        return None;
    }
    let event = match header.member()?.as_str() {
        "NameAcquired" => NameEvent::Acquired,
        "NameLost" => NameEvent::Lost,
        _ => return None,
    };
    let subject = msg.body().deserialize::<String>().ok()?;
    (subject == name).then_some(event)
}
