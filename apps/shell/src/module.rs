//! # Page Module Contract
//!
//! What a page module implements, what it gets handed, and how it makes
//! itself known to the loader.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register_module("catalog", || Box::new(Catalog))    (once, at startup) │
//! │                                                                         │
//! │  every load of "catalog":                                               │
//! │     factory() ──► fresh instance                                        │
//! │          │                                                              │
//! │          ▼                                                              │
//! │     init(&ctx, payload) ──► render regions, subscribe via ctx           │
//! │          │                                                              │
//! │          ▼                                                              │
//! │     ... user interaction arrives as bus events ...                      │
//! │          │                                                              │
//! │     next load ──► unmount(&ctx) ──► ctx subscriptions released          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Page modules never call each other. They talk through the store and the
//! bus the [`ModuleContext`] exposes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, trace};

use showroom_core::{AppEvent, EventBus, StateChange, Subscription};
use showroom_store::StateStore;

use crate::document::DocumentHandle;
use crate::error::ShellResult;

// =============================================================================
// PageModule
// =============================================================================

/// A page module's behavior bundle.
pub trait PageModule: Send + Sync {
    /// Entry point, called once per load with the navigation payload.
    ///
    /// Errors and panics are caught and logged by the loader; the module is
    /// still recorded as current.
    fn init(&self, ctx: &ModuleContext, payload: Option<Value>) -> ShellResult<()>;

    /// Called before the module's markup is discarded.
    fn unmount(&self, _ctx: &ModuleContext) {}
}

/// Produces a fresh module instance per load.
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn PageModule> + Send + Sync>;

// =============================================================================
// BundleRegistry
// =============================================================================

/// Behavior bundles by module name.
#[derive(Default)]
pub struct BundleRegistry {
    factories: RwLock<HashMap<String, ModuleFactory>>,
}

impl std::fmt::Debug for BundleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("BundleRegistry").field("modules", &names).finish()
    }
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory for `name`, replacing any earlier one.
    pub fn register_module<F>(&self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn PageModule> + Send + Sync + 'static,
    {
        let replaced = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::new(factory))
            .is_some();
        debug!(module = name, replaced, "Bundle registered");
    }

    /// Creates a fresh instance, or `None` if nothing is registered.
    pub fn instantiate(&self, name: &str) -> Option<Box<dyn PageModule>> {
        let factory = self.read().get(name).cloned()?;
        Some(factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ModuleFactory>> {
        self.factories.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// ModuleContext
// =============================================================================

struct ContextInner {
    module: String,
    seq: u64,
    store: Arc<StateStore>,
    bus: EventBus,
    document: DocumentHandle,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// Everything a page module instance may touch.
///
/// Cheap to clone; clones share the subscription list, so handlers can
/// capture a clone and render from inside a delivery.
#[derive(Clone)]
pub struct ModuleContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("module", &self.inner.module)
            .field("seq", &self.inner.seq)
            .field("subscriptions", &self.lock_subscriptions().len())
            .finish()
    }
}

impl ModuleContext {
    /// Creates the context for the instance mounted by load `seq`.
    pub fn new(
        module: impl Into<String>,
        seq: u64,
        store: Arc<StateStore>,
        document: DocumentHandle,
    ) -> Self {
        let bus = store.bus().clone();
        ModuleContext {
            inner: Arc::new(ContextInner {
                module: module.into(),
                seq,
                store,
                bus,
                document,
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.inner.module
    }

    pub fn store(&self) -> &StateStore {
        &self.inner.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Shorthand for `store().get(key)`.
    pub fn get(&self, key: &str) -> Value {
        self.inner.store.get(key)
    }

    /// Shorthand for `store().set(key, value)`.
    pub fn set(&self, key: &str, value: Value) {
        self.inner.store.set(key, value);
    }

    /// Asks the router to mount `module`.
    pub fn navigate(&self, module: &str, data: Option<Value>) {
        self.inner.bus.publish(AppEvent::navigate(module, data));
    }

    /// Reports a successful login with the raw user record.
    pub fn authenticate(&self, user: Value) {
        self.inner.bus.publish(AppEvent::user_authenticated(user));
    }

    /// Asks the router to end the session.
    pub fn logout(&self) {
        self.inner.bus.publish(AppEvent::UserLogout);
    }

    /// Publishes a custom event.
    pub fn emit(&self, name: &str, detail: Value) {
        self.inner.bus.publish(AppEvent::custom(name, detail));
    }

    /// Subscribes for as long as this instance is mounted.
    pub fn subscribe<F>(&self, event: &str, handler: F)
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let subscription = self.inner.bus.subscribe(event, handler);
        self.lock_subscriptions().push(subscription);
    }

    /// Subscribes to writes of one key for as long as this instance is mounted.
    pub fn subscribe_key<F>(&self, key: &str, handler: F)
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let subscription = self.inner.bus.subscribe_key(key, handler);
        self.lock_subscriptions().push(subscription);
    }

    /// Fills a region of this module's markup.
    ///
    /// Returns false (and changes nothing) once another load has replaced
    /// the container.
    pub fn render(&self, region: &str, markup: impl Into<String>) -> bool {
        let written = self
            .inner
            .document
            .lock()
            .render_region(self.inner.seq, region, markup);

        if !written {
            trace!(module = %self.inner.module, region, "Render from unmounted instance ignored");
        }
        written
    }

    /// Drops every subscription made through this context.
    ///
    /// Returns the number released.
    pub fn release_subscriptions(&self) -> usize {
        let subscriptions: Vec<Subscription> = self.lock_subscriptions().drain(..).collect();
        for subscription in &subscriptions {
            self.inner.bus.unsubscribe(subscription);
        }
        subscriptions.len()
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
