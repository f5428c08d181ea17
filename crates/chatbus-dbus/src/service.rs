//! The service loop: name ownership, request handling, and shutdown.

use crate::config::{BusKind, ServiceConfig};
use crate::router::{BusError, Reply, Request, Router};
use crate::sink::BusSignalSink;
use crate::wire::{self, ReplyHandle};
use chatbus_core::{
    CoreError, LifecycleController, NameEvent, OwnershipState, RegistrationHandle, SignalSink,
    TestObject,
};
use chatbus_schema::{SchemaError, BUS_NAME, OBJECT_PATH, TEST_INTERFACE};
use futures_util::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use zbus::fdo::{DBusProxy, RequestNameFlags, RequestNameReply};
use zbus::message::Type;
use zbus::names::WellKnownName;
use zbus::{connection, Connection, MessageStream};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),
    #[error("D-Bus call failed: {0}")]
    Fdo(#[from] zbus::fdo::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("lost ownership of {0}")]
    NameLost(String),
    #[error("bus connection closed")]
    Disconnected,
}

/// Connection-independent service state: the ownership lifecycle and the objects
/// exported while the name is held.
pub struct Service<S> {
    lifecycle: LifecycleController,
    router: Router<S>,
    registration: Option<RegistrationHandle>,
}

impl<S: SignalSink> Service<S> {
    pub fn new(object: TestObject<S>) -> Result<Self, ServiceError> {
        TEST_INTERFACE.validate()?;
        let mut router = Router::new();
        let registration = router.register(object)?;
        Ok(Self {
            lifecycle: LifecycleController::new(BUS_NAME),
            router,
            registration: Some(registration),
        })
    }

    pub fn router(&self) -> &Router<S> {
        &self.router
    }

    pub fn state(&self) -> OwnershipState {
        self.lifecycle.state()
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    pub fn begin_request(&mut self) -> Result<(), ServiceError> {
        self.lifecycle.apply(NameEvent::Requested)?;
        Ok(())
    }

    /// Fold the bus daemon's answer to `RequestName` into the lifecycle.
    pub fn on_request_reply(&mut self, reply: RequestNameReply) -> Result<(), ServiceError> {
        match reply {
            RequestNameReply::PrimaryOwner | RequestNameReply::AlreadyOwner => {
                self.on_name_event(NameEvent::Acquired)
            }
            RequestNameReply::Exists | RequestNameReply::InQueue => {
                warn!("{BUS_NAME} is owned by another connection");
                self.on_name_event(NameEvent::Lost)
            }
        }
    }

    /// Apply a name event. Losing the name unregisters the object and ends the
    /// service with [`ServiceError::NameLost`].
    pub fn on_name_event(&mut self, event: NameEvent) -> Result<(), ServiceError> {
        self.lifecycle.apply(event)?;
        if self.lifecycle.is_lost() {
            self.teardown()?;
            return Err(ServiceError::NameLost(self.lifecycle.name().to_owned()));
        }
        Ok(())
    }

    pub fn begin_shutdown(&mut self) -> Result<(), ServiceError> {
        self.lifecycle.apply(NameEvent::ShutdownRequested)?;
        Ok(())
    }

    /// Unregister the exported object and settle the lifecycle back to unowned.
    pub fn teardown(&mut self) -> Result<(), ServiceError> {
        if let Some(handle) = self.registration.take() {
            debug!("unregistering {}", handle.path());
            self.router.unregister(handle)?;
        }
        if matches!(
            self.state(),
            OwnershipState::NameLost | OwnershipState::Unregistering
        ) {
            self.lifecycle.apply(NameEvent::Released)?;
        }
        Ok(())
    }

    pub async fn handle(&self, path: &str, request: Request) -> Result<Reply, BusError> {
        self.router.route(path, request).await
    }
}

async fn connect(kind: BusKind) -> zbus::Result<Connection> {
    match kind {
        BusKind::Session => connection::Builder::session()?.build().await,
        BusKind::System => connection::Builder::system()?.build().await,
    }
}

fn install_shutdown_handler() -> Result<Arc<Notify>, ServiceError> {
    let notify = Arc::new(Notify::new());
    let waker = Arc::clone(&notify);
    ctrlc::set_handler(move || waker.notify_one())?;
    Ok(notify)
}

/// Connect, claim the well-known name, and serve until shutdown or name loss.
pub async fn run_service(config: &ServiceConfig) -> Result<(), ServiceError> {
    let conn = connect(config.bus).await?;
    info!(
        "connected to the {} bus as {}",
        config.bus,
        conn.unique_name().map_or("<unknown>", |n| n.as_str())
    );
    let mut stream = MessageStream::from(&conn);

    let object = TestObject::new(OBJECT_PATH, BusSignalSink::new(&conn));
    let mut service = Service::new(object)?;
    info!("exported {OBJECT_PATH}");

    let bus = DBusProxy::new(&conn).await?;
    let name = WellKnownName::try_from(BUS_NAME).map_err(zbus::Error::from)?;
    service.begin_request()?;
    let reply = bus
        .request_name(name.clone(), RequestNameFlags::DoNotQueue.into())
        .await?;
    service.on_request_reply(reply)?;

    let shutdown = install_shutdown_handler()?;
    info!("serving {BUS_NAME}");

    loop {
        tokio::select! {
            () = shutdown.notified() => {
                info!("shutdown requested");
                break;
            }
            next = stream.next() => {
                let Some(msg) = next else {
                    error!("message stream ended");
                    service.teardown()?;
                    return Err(ServiceError::Disconnected);
                };
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("dropping unreadable message: {e}");
                        continue;
                    }
                };
                match msg.message_type() {
                    Type::MethodCall => {
                        let Some((path, request)) =
                            wire::decode_call(&msg, |p| service.router().descriptor_at(p))
                        else {
                            continue;
                        };
                        let outcome = service.handle(&path, request).await;
                        if let Err(e) = ReplyHandle::new(&conn, msg).send(outcome).await {
                            warn!("failed to send reply: {e}");
                        }
                    }
                    Type::Signal => {
                        if let Some(event) = wire::name_event(&msg, BUS_NAME) {
                            service.on_name_event(event)?;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    service.begin_shutdown()?;
    if let Err(e) = bus.release_name(name).await {
        warn!("failed to release {BUS_NAME}: {e}");
    }
    service.teardown()?;
    info!("stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbus_core::{Invocation, RecordingSink};
    use chatbus_schema::{ErrorName, Value, INTERFACE_NAME};

    fn service() -> Service<Arc<RecordingSink>> {
        let object = TestObject::new(OBJECT_PATH, Arc::new(RecordingSink::new()));
        Service::new(object).unwrap()
    }

    #[test]
    fn new_service_exports_object_unowned() {
        let svc = service();
        assert_eq!(svc.state(), OwnershipState::Unowned);
        assert!(svc.is_registered());
        assert!(svc.router().object(OBJECT_PATH).is_some());
    }

    #[test]
    fn request_reply_drives_lifecycle() {
        let mut svc = service();
        svc.begin_request().unwrap();
        svc.on_request_reply(RequestNameReply::PrimaryOwner).unwrap();
        assert_eq!(svc.state(), OwnershipState::NameOwned);
        svc.on_name_event(NameEvent::Acquired).unwrap();
        assert_eq!(svc.state(), OwnershipState::NameOwned);
    }

    #[test]
    fn name_taken_is_fatal() {
        let mut svc = service();
        svc.begin_request().unwrap();
        let err = svc.on_request_reply(RequestNameReply::Exists).unwrap_err();
        assert!(matches!(err, ServiceError::NameLost(ref n) if n == BUS_NAME));
        assert!(!svc.is_registered());
        assert_eq!(svc.state(), OwnershipState::Unowned);
    }

    #[test]
    fn shutdown_unregisters_and_releases() {
        let mut svc = service();
        svc.begin_request().unwrap();
        svc.on_request_reply(RequestNameReply::AlreadyOwner).unwrap();
        svc.begin_shutdown().unwrap();
        assert_eq!(svc.state(), OwnershipState::Unregistering);
        svc.teardown().unwrap();
        assert_eq!(svc.state(), OwnershipState::Unowned);
        assert!(svc.router().object(OBJECT_PATH).is_none());
        // A second teardown has nothing left to do.
        svc.teardown().unwrap();
    }

    fn owned_service() -> Service<Arc<RecordingSink>> {
        let mut svc = service();
        svc.begin_request().unwrap();
        svc.on_request_reply(RequestNameReply::PrimaryOwner).unwrap();
        svc
    }

    fn get_title() -> Request {
        Request::GetProperty {
            interface: INTERFACE_NAME.to_owned(),
            name: "Title".to_owned(),
        }
    }

    #[test]
    fn name_lost_while_owned_is_fatal() {
        let mut svc = owned_service();
        let err = svc.on_name_event(NameEvent::Lost).unwrap_err();
        assert!(matches!(err, ServiceError::NameLost(ref n) if n == BUS_NAME));
        assert_eq!(err.to_string(), format!("lost ownership of {BUS_NAME}"));
        assert!(!svc.is_registered());
        assert!(svc.router().object(OBJECT_PATH).is_none());
        assert_eq!(svc.state(), OwnershipState::Unowned);
    }

    #[tokio::test]
    async fn calls_after_name_loss_find_no_object() {
        let mut svc = owned_service();
        assert_eq!(
            svc.handle(OBJECT_PATH, get_title()).await.unwrap(),
            Reply::Variant(Value::from("Chat D-Bus!"))
        );

        svc.on_name_event(NameEvent::Lost).unwrap_err();

        let err = svc.handle(OBJECT_PATH, get_title()).await.unwrap_err();
        assert_eq!(err.name, ErrorName::UNKNOWN_OBJECT);
        let call = Request::Method(Invocation::new(":1.8", "Login", vec![Value::from("hi")]));
        let err = svc.handle(OBJECT_PATH, call).await.unwrap_err();
        assert_eq!(err.name, ErrorName::UNKNOWN_OBJECT);
    }
}
