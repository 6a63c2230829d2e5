//! # showroom-core: Contract Types & Coordination Primitives
//!
//! This crate is the **contract** every page module and the shell agree on.
//! It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Showroom Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Page Modules                                 │   │
//! │  │    login ──► catalog ──► cart ──► checkout ──► dashboard ...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ModuleContext                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    Shell (loader / router)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ showroom-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  events   │  │ registry  │  │ validation│  │   │
//! │  │   │  Session  │  │ EventBus  │  │ Module    │  │  keys &   │  │   │
//! │  │   │  Role     │  │ AppEvent  │  │ Registry  │  │  names    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO STORAGE • NO NETWORK • NO DOCUMENT ACCESS                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               showroom-store (StateStore + storage)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Session, Role, ModuleDescriptor, NavigationRequest, StateChange
//! - [`events`] - The in-process [`EventBus`] and its event vocabulary
//! - [`registry`] - The static module descriptor table
//! - [`error`] - Domain error types
//! - [`validation`] - State key and module name rules
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use showroom_core::{AppEvent, EventBus, STATE_UPDATED};
//!
//! let bus = EventBus::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let log = seen.clone();
//! bus.subscribe(STATE_UPDATED, move |event| {
//!     log.lock().unwrap().push(event.name().to_string());
//! });
//!
//! bus.publish(AppEvent::state_updated("cart", serde_json::json!([])));
//! assert_eq!(*seen.lock().unwrap(), vec!["state-updated".to_string()]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod events;
pub mod registry;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use events::{
    AppEvent, EventBus, Subscription, NAVIGATE_TO_MODULE, STATE_UPDATED, USER_AUTHENTICATED,
    USER_LOGOUT,
};
pub use registry::ModuleRegistry;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix applied to every durable storage entry name.
///
/// Keeps the shell's entries apart from unrelated data sharing the same
/// storage origin. `"cart"` is stored as `"showroomCart"`.
pub const STORAGE_PREFIX: &str = "showroom";

/// Durable entry name of the persisted session (outside the per-key scheme).
pub const SESSION_ENTRY: &str = "showroomCurrentUser";

/// Upper bound on queued deliveries processed by a single bus drain.
///
/// A handler that writes state on every `state-updated` it sees would
/// otherwise loop forever.
pub const MAX_CASCADE_DELIVERIES: usize = 1024;
