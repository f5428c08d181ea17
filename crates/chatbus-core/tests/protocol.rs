//! Object-level protocol properties, exercised against a recording sink.

use chatbus_core::{Invocation, ObjectError, RecordingSink, Signal, TestObject};
use chatbus_schema::{Value, INTERFACE_NAME, OBJECT_PATH, PROPERTIES_INTERFACE};
use std::collections::HashSet;
use std::sync::Arc;

fn object() -> (Arc<RecordingSink>, Arc<TestObject<Arc<RecordingSink>>>) {
    let sink = Arc::new(RecordingSink::new());
    let object = Arc::new(TestObject::new(OBJECT_PATH, Arc::clone(&sink)));
    (sink, object)
}

fn title_changes(sink: &RecordingSink) -> Vec<String> {
    sink.signals()
        .into_iter()
        .filter_map(|signal| match signal {
            Signal::PropertiesChanged { changed, .. } => {
                assert_eq!(changed.len(), 1);
                let (name, value) = changed.into_iter().next()?;
                assert_eq!(name, "Title");
                value.into_string()
            }
            Signal::MsgNotification { .. } => None,
        })
        .collect()
}

#[tokio::test]
async fn login_reply_for_many_greetings() {
    let (sink, object) = object();
    for (greeting, sender) in [("hello", ":1.1"), ("", ":1.2"), ("a b\tc", "peer"), ("ünï", ":9.99")] {
        let out = object
            .call_method(&Invocation::new(sender, "Login", vec![Value::from(greeting)]))
            .await
            .unwrap();
        assert_eq!(out, vec![Value::Str(format!("Got '{greeting}' from {sender}"))]);
    }
    assert!(sink.is_empty());
}

#[tokio::test]
async fn send_msg_emits_before_returning() {
    let (sink, object) = object();
    let out = object
        .call_method(&Invocation::new(":1.3", "SendMsg", vec![Value::from("ping")]))
        .await
        .unwrap();

    // The signal is already recorded by the time the reply value exists.
    assert!(out.is_empty());
    let emitted = sink.emitted();
    assert_eq!(emitted.len(), 1);
    let (path, signal) = &emitted[0];
    assert_eq!(path, OBJECT_PATH);
    assert_eq!(signal.interface(), INTERFACE_NAME);
    assert_eq!(
        signal,
        &Signal::MsgNotification {
            interface: INTERFACE_NAME.to_owned(),
            sender: ":1.3".to_owned(),
            msg: "ping".to_owned(),
        }
    );
}

#[tokio::test]
async fn unsupported_method_has_no_side_effects() {
    let (sink, object) = object();
    object.set_property("Title", Value::from("before")).await.unwrap();
    let signals_before = sink.len();

    for method in ["Logout", "", "Introspect", "SENDMSG"] {
        let err = object
            .call_method(&Invocation::new(":1.4", method, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ObjectError::UnsupportedMethod { .. }));
        assert_eq!(
            err.error_name(object.interface()),
            "io.starnight.dbus_test.TestInterface.Failed"
        );
        assert_eq!(err.to_string(), "Unsupported method call");
    }

    assert_eq!(sink.len(), signals_before);
    assert_eq!(object.get_property("Title").await, Some(Value::from("before")));
}

#[tokio::test]
async fn title_defaults_then_returns_last_write() {
    let (_sink, object) = object();
    assert_eq!(object.get_property("Title").await, Some(Value::from("Chat D-Bus!")));

    for v in ["one", "two", ""] {
        assert!(object.set_property("Title", Value::from(v)).await.unwrap());
        assert_eq!(object.get_property("Title").await, Some(Value::from(v)));
    }
}

#[tokio::test]
async fn set_title_emits_exactly_one_properties_changed() {
    let (sink, object) = object();
    assert!(object.set_property("Title", Value::from("Room")).await.unwrap());

    let signals = sink.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].interface(), PROPERTIES_INTERFACE);
    assert_eq!(
        signals[0],
        Signal::PropertiesChanged {
            changed_interface: INTERFACE_NAME.to_owned(),
            changed: vec![("Title".to_owned(), Value::from("Room"))],
            invalidated: Vec::new(),
        }
    );
}

#[tokio::test]
async fn other_property_names_never_emit_or_mutate() {
    let (sink, object) = object();
    for name in ["title", "Subtitle", ""] {
        assert_eq!(object.get_property(name).await, None);
        assert!(!object.set_property(name, Value::from("x")).await.unwrap());
    }
    assert!(sink.is_empty());
    assert_eq!(object.get_property("Title").await, Some(Value::from("Chat D-Bus!")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sets_are_serialized() {
    const N: usize = 64;
    let (sink, object) = object();

    let tasks: Vec<_> = (0..N)
        .map(|i| {
            let object = Arc::clone(&object);
            tokio::spawn(async move {
                object
                    .set_property("Title", Value::Str(format!("title-{i}")))
                    .await
            })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap());
    }

    let written: HashSet<String> = (0..N).map(|i| format!("title-{i}")).collect();
    let changes = title_changes(&sink);
    assert_eq!(changes.len(), N);
    assert_eq!(changes.iter().collect::<HashSet<_>>().len(), N);

    let final_value = object
        .get_property("Title")
        .await
        .and_then(Value::into_string)
        .unwrap();
    assert!(written.contains(&final_value));
    // Writes and notifications are committed under the same lock.
    assert_eq!(changes.last(), Some(&final_value));
}
