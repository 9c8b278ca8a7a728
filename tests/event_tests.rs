// SPDX-License-Identifier: PMPL-1.0-or-later

//! Event registration, suspension and dispatch

use smart_factory::events::{EventManager, EventParams};
use smart_factory::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn counter(manager: &EventManager, event: &str) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    manager
        .add_handler(event, move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("handler should register");
    calls
}

#[test]
fn test_fire_passes_name_and_params() {
    let manager = EventManager::new();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    manager
        .add_handler("order_saved", move |event, params| {
            sink.lock().unwrap().push((event.to_string(), params.clone()));
            Ok(())
        })
        .unwrap();

    let mut params = EventParams::new();
    params.insert("order_id".to_string(), 42.into());
    assert_eq!(manager.fire_event("order_saved", &params).unwrap(), 1);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, "order_saved");
    assert_eq!(received[0].1["order_id"], 42);
}

#[test]
fn test_handlers_run_in_registration_order() {
    let manager = EventManager::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for n in 0..3 {
        let order = Arc::clone(&order);
        manager
            .add_handler("ping", move |_, _| {
                order.lock().unwrap().push(n);
                Ok(())
            })
            .unwrap();
    }

    manager.fire_event("ping", &EventParams::new()).unwrap();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_deleted_handler_is_not_called() {
    let manager = EventManager::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let id = manager
        .add_handler("ping", move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    let other = counter(&manager, "ping");

    manager.delete_handler("ping", id).unwrap();
    assert_eq!(manager.fire_event("ping", &EventParams::new()).unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(other.load(Ordering::SeqCst), 1);
}

#[test]
fn test_suspended_event_is_silent_until_resumed() {
    let manager = EventManager::new();
    let calls = counter(&manager, "ping");

    manager.suspend_event("ping").unwrap();
    assert!(manager.is_suspended("ping"));
    assert_eq!(manager.fire_event("ping", &EventParams::new()).unwrap(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    manager.resume_event("ping").unwrap();
    assert_eq!(manager.fire_event("ping", &EventParams::new()).unwrap(), 1);

    manager.suspend_event("ping").unwrap();
    manager.resume_all_events();
    assert_eq!(manager.fire_event("ping", &EventParams::new()).unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_keyed_registration_is_idempotent() {
    let manager = EventManager::new();
    let first = manager.add_keyed_handler("ping", "audit", |_, _| Ok(())).unwrap();
    let second = manager.add_keyed_handler("ping", "audit", |_, _| Ok(())).unwrap();
    assert_eq!(first, second);
    assert_eq!(manager.handler_count("ping"), 1);
}

#[test]
fn test_failing_handler_stops_dispatch() {
    let manager = EventManager::new();
    manager
        .add_handler("ping", |_, _| Err(anyhow::anyhow!("mailer down")))
        .unwrap();
    let later = counter(&manager, "ping");

    let err = manager.fire_event("ping", &EventParams::new()).unwrap_err();
    assert!(matches!(err, Error::Handler { ref event, .. } if event == "ping"));
    assert!(err.to_string().contains("mailer down"));
    assert_eq!(later.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_event_name_is_rejected() {
    let manager = EventManager::new();
    assert!(matches!(
        manager.add_handler("", |_, _| Ok(())),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        manager.fire_event("", &EventParams::new()),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_delete_all_handlers() {
    let manager = EventManager::new();
    counter(&manager, "a");
    counter(&manager, "b");
    manager.delete_all_handlers();
    assert_eq!(manager.fire_event("a", &EventParams::new()).unwrap(), 0);
    assert_eq!(manager.handler_count("b"), 0);
}
