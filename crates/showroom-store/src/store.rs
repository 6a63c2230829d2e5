//! # State Store
//!
//! The process-wide key/value map page modules share.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  store.set("cart", value)                                               │
//! │       │                                                                 │
//! │       ├─1─► memory["cart"] = value          (visible to get() at once)  │
//! │       │                                                                 │
//! │       ├─2─► storage["showroomCart"] = JSON  (failure: key degrades to   │
//! │       │                                      memory-only, logged)       │
//! │       │                                                                 │
//! │       └─3─► bus.publish(state-updated {key: "cart", value})             │
//! │                  │                                                      │
//! │                  └──► listeners calling get("cart") see the new value   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read Path
//! memory → durable storage → empty array. A read never fails and never
//! returns a missing-value marker.
//!
//! ## Session Slot
//! The current session lives outside the per-key scheme under
//! `<prefix>CurrentUser`. It is loaded once when the store is built, so a
//! restart resumes the previous login.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, info, warn};

use showroom_core::validation::validate_state_key;
use showroom_core::{empty_state, AppEvent, EventBus, Session, STORAGE_PREFIX};

use crate::error::{StorageError, StorageResult};
use crate::storage::DurableStorage;

/// Suffix of the session entry name.
const SESSION_SUFFIX: &str = "CurrentUser";

/// Shared state store.
///
/// Built once at bootstrap and shared behind an `Arc`. Every method takes
/// `&self`; no lock is held while the bus delivers.
pub struct StateStore {
    storage: Arc<dyn DurableStorage>,
    bus: EventBus,
    prefix: String,
    memory: RwLock<HashMap<String, Value>>,
    session: RwLock<Option<Session>>,
    degraded: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("prefix", &self.prefix)
            .field("keys", &self.read_memory().len())
            .field("degraded", &self.lock_degraded().len())
            .finish()
    }
}

impl StateStore {
    /// Creates a store using the default entry prefix.
    pub fn new(storage: Arc<dyn DurableStorage>, bus: EventBus) -> Self {
        Self::with_prefix(storage, bus, STORAGE_PREFIX)
    }

    /// Creates a store whose entries are named `<prefix><Key>`.
    ///
    /// Loads the persisted session, if any. An unreadable session entry is
    /// logged and treated as "no session".
    pub fn with_prefix(
        storage: Arc<dyn DurableStorage>,
        bus: EventBus,
        prefix: impl Into<String>,
    ) -> Self {
        let store = StateStore {
            storage,
            bus,
            prefix: prefix.into(),
            memory: RwLock::new(HashMap::new()),
            session: RwLock::new(None),
            degraded: Mutex::new(HashSet::new()),
        };

        match store.load_session() {
            Ok(Some(session)) => {
                info!(user = %session.id, role = %session.role, "Resumed persisted session");
                *store.write_session() = Some(session);
            }
            Ok(None) => debug!("No persisted session"),
            Err(e) => warn!(error = %e, "Ignoring unreadable session entry"),
        }

        store
    }

    /// The bus this store publishes on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Durable entry name for `key`: prefix plus the key with its first
    /// character upper-cased (`"cart"` → `"showroomCart"`).
    pub fn storage_name(&self, key: &str) -> String {
        let mut chars = key.chars();
        match chars.next() {
            Some(first) => {
                let capitalized: String = first.to_uppercase().chain(chars).collect();
                format!("{}{}", self.prefix, capitalized)
            }
            None => self.prefix.clone(),
        }
    }

    /// Durable entry name of the session slot.
    pub fn session_entry(&self) -> String {
        format!("{}{}", self.prefix, SESSION_SUFFIX)
    }

    // =========================================================================
    // Generic keys
    // =========================================================================

    /// Returns the value of `key`, or an empty array if it was never written.
    pub fn get(&self, key: &str) -> Value {
        if let Some(value) = self.read_memory().get(key) {
            return value.clone();
        }

        match self.read_durable(key) {
            Ok(Some(value)) => {
                // A concurrent set() may have landed while we read storage.
                self.write_memory()
                    .entry(key.to_string())
                    .or_insert(value)
                    .clone()
            }
            Ok(None) => empty_state(),
            Err(e) => {
                warn!(key, error = %e, "Durable read failed, using empty value");
                empty_state()
            }
        }
    }

    /// Replaces the value of `key`, persists it and publishes
    /// `state-updated {key, value}`.
    ///
    /// Never fails. If persisting fails the value stays in memory and the key
    /// is recorded in [`degraded_keys`](Self::degraded_keys).
    pub fn set(&self, key: &str, value: Value) {
        self.write_memory().insert(key.to_string(), value.clone());

        match self.persist(key, &value) {
            Ok(()) => {
                self.lock_degraded().remove(key);
            }
            Err(e) => {
                warn!(key, error = %e, "Persisting failed, key is memory-only");
                self.lock_degraded().insert(key.to_string());
            }
        }

        debug!(key, "State updated");
        self.bus.publish(AppEvent::state_updated(key, value));
    }

    /// Forgets `key` in memory and storage and publishes `state-updated`
    /// with a `null` value. Later reads return the empty array.
    pub fn remove(&self, key: &str) {
        self.write_memory().remove(key);

        if validate_state_key(key).is_ok() && self.storage_name(key) != self.session_entry() {
            if let Err(e) = self.storage.remove_item(&self.storage_name(key)) {
                warn!(key, error = %e, "Removing durable entry failed");
            }
        }
        self.lock_degraded().remove(key);

        debug!(key, "State removed");
        self.bus.publish(AppEvent::state_updated(key, Value::Null));
    }

    /// Keys known to memory or durable storage, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = self.read_memory().keys().cloned().collect();
        let session_entry = self.session_entry();

        match self.storage.item_names() {
            Ok(names) => {
                for name in names {
                    if name == session_entry {
                        continue;
                    }
                    if let Some(rest) = name.strip_prefix(self.prefix.as_str()) {
                        let mut chars = rest.chars();
                        if let Some(first) = chars.next() {
                            keys.insert(first.to_lowercase().chain(chars).collect());
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "Listing durable entries failed"),
        }

        keys.into_iter().collect()
    }

    /// Keys whose latest write could not be persisted, sorted.
    pub fn degraded_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock_degraded().iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Loads `keys` from durable storage into memory. Keys already in memory
    /// are left alone; corrupt entries are skipped with a warning.
    ///
    /// Returns the number of keys loaded.
    pub fn hydrate(&self, keys: &[&str]) -> usize {
        let mut loaded = 0;

        for key in keys {
            if self.read_memory().contains_key(*key) {
                continue;
            }

            match self.read_durable(key) {
                Ok(Some(value)) => {
                    self.write_memory().entry(key.to_string()).or_insert(value);
                    loaded += 1;
                }
                Ok(None) => {}
                Err(e) => warn!(key, error = %e, "Skipping unreadable entry"),
            }
        }

        info!(loaded, requested = keys.len(), "Store hydrated");
        loaded
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// The authenticated principal, if any.
    pub fn current_session(&self) -> Option<Session> {
        self.read_session().clone()
    }

    /// Stores and persists the session.
    pub fn set_session(&self, session: Session) {
        let persisted = serde_json::to_string(&session)
            .map_err(StorageError::from)
            .and_then(|text| self.storage.set_item(&self.session_entry(), &text));

        if let Err(e) = persisted {
            warn!(error = %e, "Persisting session failed, session is memory-only");
        }

        info!(user = %session.id, role = %session.role, "Session started");
        *self.write_session() = Some(session);
    }

    /// Clears the session and removes its durable entry.
    pub fn clear_session(&self) {
        let previous = self.write_session().take();

        if let Err(e) = self.storage.remove_item(&self.session_entry()) {
            warn!(error = %e, "Removing session entry failed");
        }

        if let Some(session) = previous {
            info!(user = %session.id, "Session cleared");
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn persist(&self, key: &str, value: &Value) -> StorageResult<()> {
        validate_state_key(key).map_err(|e| StorageError::InvalidName(e.to_string()))?;

        let name = self.storage_name(key);
        if name == self.session_entry() {
            return Err(StorageError::InvalidName(format!(
                "'{key}' maps onto the session entry"
            )));
        }

        let text = serde_json::to_string(value)?;
        self.storage.set_item(&name, &text)
    }

    fn read_durable(&self, key: &str) -> StorageResult<Option<Value>> {
        if validate_state_key(key).is_err() {
            return Ok(None);
        }

        let name = self.storage_name(key);
        if name == self.session_entry() {
            return Ok(None);
        }

        match self.storage.get_item(&name)? {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StorageError::corrupt(name, e)),
            None => Ok(None),
        }
    }

    fn load_session(&self) -> StorageResult<Option<Session>> {
        let name = self.session_entry();
        match self.storage.get_item(&name)? {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StorageError::corrupt(name, e)),
            None => Ok(None),
        }
    }

    fn read_memory(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Value>> {
        self.memory.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_memory(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.memory.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_session(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_degraded(&self) -> MutexGuard<'_, HashSet<String>> {
        self.degraded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
