//! The bus as page modules see it: shared clones, cross-thread publishers
//! and the JSON shapes of the public events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::json;
use showroom_core::{
    keys, AppEvent, EventBus, ModuleDescriptor, ModuleRegistry, NAVIGATE_TO_MODULE, STATE_UPDATED,
};

#[test]
fn every_publish_from_every_thread_is_delivered() {
    let bus = EventBus::new();
    let delivered = Arc::new(AtomicUsize::new(0));

    let counter = delivered.clone();
    bus.subscribe("tick", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let publishers: Vec<_> = (0..4)
        .map(|_| {
            let bus = bus.clone();
            thread::spawn(move || {
                for n in 0..100 {
                    bus.publish(AppEvent::custom("tick", json!(n)));
                }
            })
        })
        .collect();

    for publisher in publishers {
        publisher.join().unwrap();
    }

    assert_eq!(delivered.load(Ordering::SeqCst), 400);
}

#[test]
fn cart_writes_are_observed_in_order() {
    let bus = EventBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let sink = log.clone();
    bus.subscribe_key(keys::CART, move |change| {
        sink.lock().unwrap().push(change.value.clone());
    });

    bus.publish(AppEvent::state_updated(keys::CART, json!([])));
    bus.publish(AppEvent::state_updated(keys::PRODUCTS, json!([{"id": 1}])));
    bus.publish(AppEvent::state_updated(
        keys::CART,
        json!([{"id": 1, "qty": 2, "price": 100}]),
    ));

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], json!([]));
    assert_eq!(log[1].as_array().unwrap().len(), 1);
}

#[test]
fn navigation_handler_can_write_state_without_recursing() {
    let bus = EventBus::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let writer = bus.clone();
    let trace = order.clone();
    bus.subscribe(NAVIGATE_TO_MODULE, move |event| {
        trace.lock().unwrap().push(format!("navigate:{}", event.detail()["module"]));
        writer.publish(AppEvent::state_updated("lastModule", event.detail()["module"].clone()));
        trace.lock().unwrap().push("navigate handler done".to_string());
    });

    let trace = order.clone();
    bus.subscribe(STATE_UPDATED, move |event| {
        trace.lock().unwrap().push(format!("state:{}", event.detail()["value"]));
    });

    bus.publish(AppEvent::navigate("cart", None));

    assert_eq!(
        *order.lock().unwrap(),
        vec![
            "navigate:\"cart\"".to_string(),
            "navigate handler done".to_string(),
            "state:\"cart\"".to_string(),
        ]
    );
}

#[test]
fn descriptors_serialize_in_camel_case() {
    let registry = ModuleRegistry::from_table([ModuleDescriptor::new(
        "catalog",
        "/catalog.html",
        "/catalog.css",
        "/catalog.js",
        "Catalog",
    )])
    .unwrap();

    let descriptor = registry.describe("catalog").unwrap();
    assert_eq!(
        serde_json::to_value(descriptor).unwrap(),
        json!({
            "name": "catalog",
            "markupPath": "/catalog.html",
            "stylePath": "/catalog.css",
            "scriptPath": "/catalog.js",
            "title": "Catalog"
        })
    );
}
