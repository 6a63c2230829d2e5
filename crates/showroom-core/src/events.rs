//! # Event Bus
//!
//! The publish/subscribe channel connecting page modules, the store and the
//! router without direct references.
//!
//! ## Event Vocabulary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Event                 Payload            Published by   Consumed by    │
//! │  ─────                 ───────            ────────────   ───────────    │
//! │  state-updated         {key, value}       StateStore     page modules   │
//! │  navigate-to-module    {module, data?}    page modules   router         │
//! │  user-authenticated    {user}             login module   router         │
//! │  user-logout           -                  any module     router         │
//! │  <custom>              detail             page modules   page modules   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Model (FIFO Drain)
//! ```text
//!  publish(A) ──► queue: [A]
//!                 drain ──► handler1(A) ──► publish(B) ──► queue: [B]  (returns)
//!                       ──► handler2(A)
//!                       ──► handler1(B)
//!                       ──► handler2(B)
//!  publish(A) returns: every queued delivery has run
//! ```
//! A handler that publishes never recurses into other handlers. The nested
//! event is delivered after the current event has reached every subscriber,
//! so ordering is deterministic and stack depth stays constant.
//!
//! Handlers run on the thread that started the drain. A publish from another
//! thread while a drain is running is delivered by that drain.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde_json::{json, Value};
use tracing::{error, trace};

use crate::types::{NavigationRequest, StateChange};
use crate::MAX_CASCADE_DELIVERIES;

// =============================================================================
// Event Names
// =============================================================================

/// Fired by the store for every write.
pub const STATE_UPDATED: &str = "state-updated";

/// Fired by any module that wants to transfer control.
pub const NAVIGATE_TO_MODULE: &str = "navigate-to-module";

/// Fired by the login/registration flow on success.
pub const USER_AUTHENTICATED: &str = "user-authenticated";

/// Fired by any module's logout control.
pub const USER_LOGOUT: &str = "user-logout";

// =============================================================================
// AppEvent
// =============================================================================

/// An event travelling over the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A key was written.
    StateUpdated(StateChange),
    /// A module asks the router to mount another module.
    NavigateToModule(NavigationRequest),
    /// A login flow succeeded. `user` is the raw user record.
    UserAuthenticated { user: Value },
    /// The current user logged out.
    UserLogout,
    /// Module-defined signal outside the core contract.
    Custom { name: String, detail: Value },
}

impl AppEvent {
    /// Creates a `state-updated` event.
    pub fn state_updated(key: impl Into<String>, value: Value) -> Self {
        AppEvent::StateUpdated(StateChange {
            key: key.into(),
            value,
        })
    }

    /// Creates a `navigate-to-module` event.
    pub fn navigate(module: impl Into<String>, data: Option<Value>) -> Self {
        AppEvent::NavigateToModule(NavigationRequest {
            module: module.into(),
            data,
        })
    }

    /// Creates a `user-authenticated` event.
    pub fn user_authenticated(user: Value) -> Self {
        AppEvent::UserAuthenticated { user }
    }

    /// Creates a custom event.
    pub fn custom(name: impl Into<String>, detail: Value) -> Self {
        AppEvent::Custom {
            name: name.into(),
            detail,
        }
    }

    /// Returns the event name subscribers register for.
    pub fn name(&self) -> &str {
        match self {
            AppEvent::StateUpdated(_) => STATE_UPDATED,
            AppEvent::NavigateToModule(_) => NAVIGATE_TO_MODULE,
            AppEvent::UserAuthenticated { .. } => USER_AUTHENTICATED,
            AppEvent::UserLogout => USER_LOGOUT,
            AppEvent::Custom { name, .. } => name,
        }
    }

    /// Returns the JSON payload as a host page would see it in `event.detail`.
    pub fn detail(&self) -> Value {
        match self {
            AppEvent::StateUpdated(change) => json!({"key": change.key, "value": change.value}),
            AppEvent::NavigateToModule(request) => match &request.data {
                Some(data) => json!({"module": request.module, "data": data}),
                None => json!({"module": request.module}),
            },
            AppEvent::UserAuthenticated { user } => json!({ "user": user }),
            AppEvent::UserLogout => json!({}),
            AppEvent::Custom { detail, .. } => detail.clone(),
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Token returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    event: String,
}

impl Subscription {
    /// The event name this subscription listens to.
    pub fn event(&self) -> &str {
        &self.event
    }
}

type Handler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

struct Registration {
    id: u64,
    event: String,
    handler: Handler,
}

struct BusInner {
    registrations: RwLock<Vec<Registration>>,
    queue: Mutex<VecDeque<AppEvent>>,
    draining: AtomicBool,
    next_id: AtomicU64,
}

// =============================================================================
// EventBus
// =============================================================================

/// Shared publish/subscribe bus.
///
/// `Clone` is cheap: every clone refers to the same subscriber table and
/// queue. The shell creates exactly one at bootstrap and hands clones to the
/// store, the router and every page module.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.read_registrations().len())
            .field("queued", &self.lock_queue().len())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        EventBus {
            inner: Arc::new(BusInner {
                registrations: RwLock::new(Vec::new()),
                queue: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers `handler` for `event`. Handlers run in subscription order.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.write_registrations().push(Registration {
            id,
            event: event.to_string(),
            handler: Arc::new(handler),
        });
        trace!(event, id, "subscribed");

        Subscription {
            id,
            event: event.to_string(),
        }
    }

    /// Registers `handler` for `state-updated` events of a single key.
    ///
    /// Delivery stays broadcast-style underneath; the filter runs inside the
    /// registered closure.
    pub fn subscribe_key<F>(&self, key: &str, handler: F) -> Subscription
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let key = key.to_string();
        self.subscribe(STATE_UPDATED, move |event| {
            if let AppEvent::StateUpdated(change) = event {
                if change.key == key {
                    handler(change);
                }
            }
        })
    }

    /// Removes a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut registrations = self.write_registrations();
        let before = registrations.len();
        registrations.retain(|registration| registration.id != subscription.id);
        registrations.len() != before
    }

    /// Number of live subscriptions for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.read_registrations()
            .iter()
            .filter(|registration| registration.event == event)
            .count()
    }

    /// Publishes an event.
    ///
    /// If no drain is running, this call drains the queue before returning.
    /// If one is (a handler publishing from inside a delivery), the event is
    /// queued and delivered by that drain once the current event has reached
    /// every subscriber.
    pub fn publish(&self, event: AppEvent) {
        trace!(event = event.name(), "queueing event");
        self.lock_queue().push_back(event);

        loop {
            if self
                .inner
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            self.drain();
            self.inner.draining.store(false, Ordering::Release);

            // A publisher on another thread may have queued after our last pop
            // but before the flag was cleared.
            if self.lock_queue().is_empty() {
                return;
            }
        }
    }

    fn drain(&self) {
        let mut delivered = 0usize;

        loop {
            let next = self.lock_queue().pop_front();
            let Some(event) = next else {
                break;
            };

            if delivered >= MAX_CASCADE_DELIVERIES {
                let dropped = {
                    let mut queue = self.lock_queue();
                    let remaining = queue.len();
                    queue.clear();
                    remaining + 1
                };
                error!(
                    limit = MAX_CASCADE_DELIVERIES,
                    dropped, "Event cascade limit reached, dropping queued events"
                );
                break;
            }

            delivered += 1;
            self.deliver(&event);
        }
    }

    fn deliver(&self, event: &AppEvent) {
        let handlers: Vec<Handler> = self
            .read_registrations()
            .iter()
            .filter(|registration| registration.event == event.name())
            .map(|registration| registration.handler.clone())
            .collect();

        trace!(event = event.name(), handlers = handlers.len(), "delivering event");

        for handler in handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                error!(
                    event = event.name(),
                    reason = %describe_panic(panic.as_ref()),
                    "Event handler panicked"
                );
            }
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<AppEvent>> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_registrations(&self) -> std::sync::RwLockReadGuard<'_, Vec<Registration>> {
        self.inner
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registrations(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Registration>> {
        self.inner
            .registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Extracts a readable message from a caught panic payload.
pub fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus, event: &str, tag: &'static str) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        bus.subscribe(event, move |e| {
            sink.lock().unwrap().push(format!("{tag}:{}", e.name()));
        });
        log
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let sink = log.clone();
            bus.subscribe(USER_LOGOUT, move |_| sink.lock().unwrap().push(tag));
        }

        bus.publish(AppEvent::UserLogout);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_publish_only_reaches_matching_event() {
        let bus = EventBus::new();
        let logout = recorder(&bus, USER_LOGOUT, "a");
        let state = recorder(&bus, STATE_UPDATED, "b");

        bus.publish(AppEvent::state_updated("cart", json!([])));

        assert!(logout.lock().unwrap().is_empty());
        assert_eq!(state.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_nested_publish_is_delivered_after_current_event() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_bus = bus.clone();
        let sink = log.clone();
        bus.subscribe(STATE_UPDATED, move |event| {
            if let AppEvent::StateUpdated(change) = event {
                sink.lock().unwrap().push(format!("h1:{}", change.key));
                if change.key == "cart" {
                    inner_bus.publish(AppEvent::state_updated("cartTotal", json!(300)));
                }
            }
        });

        let sink = log.clone();
        bus.subscribe(STATE_UPDATED, move |event| {
            if let AppEvent::StateUpdated(change) = event {
                sink.lock().unwrap().push(format!("h2:{}", change.key));
            }
        });

        bus.publish(AppEvent::state_updated("cart", json!([])));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["h1:cart", "h2:cart", "h1:cartTotal", "h2:cartTotal"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(0));
        let sink = log.clone();
        let subscription = bus.subscribe(USER_LOGOUT, move |_| *sink.lock().unwrap() += 1);

        bus.publish(AppEvent::UserLogout);
        assert!(bus.unsubscribe(&subscription));
        assert!(!bus.unsubscribe(&subscription));
        bus.publish(AppEvent::UserLogout);

        assert_eq!(*log.lock().unwrap(), 1);
        assert_eq!(bus.subscriber_count(USER_LOGOUT), 0);
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let bus = EventBus::new();
        bus.subscribe(USER_LOGOUT, |_| panic!("broken module"));
        let log = recorder(&bus, USER_LOGOUT, "after");

        bus.publish(AppEvent::UserLogout);
        bus.publish(AppEvent::UserLogout);

        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_runaway_cascade_is_bounded() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0usize));

        let inner_bus = bus.clone();
        let sink = count.clone();
        bus.subscribe("ping", move |_| {
            *sink.lock().unwrap() += 1;
            inner_bus.publish(AppEvent::custom("ping", Value::Null));
        });

        bus.publish(AppEvent::custom("ping", Value::Null));

        assert_eq!(*count.lock().unwrap(), MAX_CASCADE_DELIVERIES);

        // The bus is usable again afterwards.
        let log = recorder(&bus, USER_LOGOUT, "x");
        bus.publish(AppEvent::UserLogout);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_subscribe_key_filters_by_key() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe_key("orders", move |change| {
            sink.lock().unwrap().push(change.value.clone());
        });

        bus.publish(AppEvent::state_updated("cart", json!([1])));
        bus.publish(AppEvent::state_updated("orders", json!([2])));

        assert_eq!(*seen.lock().unwrap(), vec![json!([2])]);
    }

    #[test]
    fn test_event_detail_shapes() {
        assert_eq!(
            AppEvent::navigate("checkout", Some(json!({"step": 2}))).detail(),
            json!({"module": "checkout", "data": {"step": 2}})
        );
        assert_eq!(AppEvent::navigate("cart", None).detail(), json!({"module": "cart"}));
        assert_eq!(
            AppEvent::user_authenticated(json!({"id": 1})).detail(),
            json!({"user": {"id": 1}})
        );
        assert_eq!(AppEvent::custom("cart-opened", json!(3)).name(), "cart-opened");
    }
}
