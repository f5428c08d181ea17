use crate::emitter::{SignalEmitter, SignalSink};
use crate::object::ObjectError;
use chatbus_schema::{SenderId, Value, INTERFACE_NAME, OBJECT_PATH};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// One inbound method call, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub sender: SenderId,
    pub path: String,
    pub interface: String,
    pub member: String,
    pub args: Vec<Value>,
}

impl Invocation {
    /// A call to `member` on the exported object's interface.
    pub fn new(sender: impl Into<SenderId>, member: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sender: sender.into(),
            path: OBJECT_PATH.to_owned(),
            interface: INTERFACE_NAME.to_owned(),
            member: member.into(),
            args,
        }
    }

    #[must_use]
    pub fn with_target(mut self, path: impl Into<String>, interface: impl Into<String>) -> Self {
        self.path = path.into();
        self.interface = interface.into();
        self
    }

    fn single_str_arg(&self) -> Result<&str, ObjectError> {
        match self.args.as_slice() {
            [Value::Str(s)] => Ok(s),
            args => {
                let found: String = args.iter().map(Value::signature).collect();
                Err(ObjectError::InvalidArgs(format!(
                    "{} expects (s), got ({found})",
                    self.member
                )))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    Login,
    SendMsg,
}

/// Routes method calls to their handlers through a name table built once.
pub struct MethodDispatcher<S> {
    table: HashMap<&'static str, Handler>,
    emitter: Arc<SignalEmitter<S>>,
}

impl<S: SignalSink> MethodDispatcher<S> {
    pub fn new(emitter: Arc<SignalEmitter<S>>) -> Self {
        let table = HashMap::from([("Login", Handler::Login), ("SendMsg", Handler::SendMsg)]);
        Self { table, emitter }
    }

    pub fn handles(&self, method: &str) -> bool {
        self.table.contains_key(method)
    }

    /// Run one call to completion. `Ok` holds the output values in declaration order.
    pub async fn dispatch(&self, call: &Invocation) -> Result<Vec<Value>, ObjectError> {
        let Some(&handler) = self.table.get(call.member.as_str()) else {
            warn!("unsupported method {} from {}", call.member, call.sender);
            return Err(ObjectError::UnsupportedMethod {
                method: call.member.clone(),
            });
        };

        match handler {
            Handler::Login => Self::login(call),
            Handler::SendMsg => self.send_msg(call).await,
        }
    }

    fn login(call: &Invocation) -> Result<Vec<Value>, ObjectError> {
        let greeting = call.single_str_arg()?;
        info!("Login from {}", call.sender);
        Ok(vec![Value::Str(format!(
            "Got '{greeting}' from {}",
            call.sender
        ))])
    }

    async fn send_msg(&self, call: &Invocation) -> Result<Vec<Value>, ObjectError> {
        let msg = call.single_str_arg()?;
        info!("SendMsg from {}", call.sender);
        self.emitter.msg_notification(call.sender.as_str(), msg).await?;
        Ok(Vec::new())
    }
}
