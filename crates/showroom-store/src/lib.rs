//! # showroom-store: Shared State for Showroom
//!
//! This crate provides the process-wide key/value store every page module
//! reads and writes, mirrored to durable storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Showroom Data Flow                               │
//! │                                                                         │
//! │  Page module (catalog: "add to cart")                                   │
//! │       │ ctx.store().set("cart", [...])                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 showroom-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  StateStore   │    │   Storage     │    │    Seed      │  │   │
//! │  │   │  (store.rs)   │    │ (storage.rs)  │    │  (seed.rs)   │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ memory map    │───►│ FileStorage   │    │ demo users   │  │   │
//! │  │   │ session       │    │ MemoryStorage │    │ if empty     │  │   │
//! │  │   │ degraded keys │    │               │    │              │  │   │
//! │  │   └──────┬────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └──────────┼──────────────────────────────────────────────────────┘   │
//! │             │ publish                                                   │
//! │             ▼                                                           │
//! │  EventBus: state-updated {key: "cart", value: [...]}                    │
//! │             │                                                           │
//! │             ▼                                                           │
//! │  Live page modules re-render (cart badge, dashboard counters)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The [`StateStore`] and its session slot
//! - [`storage`] - Durable storage trait and backends
//! - [`seed`] - Demo user seeding
//! - [`error`] - Storage error types
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use showroom_core::EventBus;
//! use showroom_store::{MemoryStorage, StateStore};
//!
//! let store = StateStore::new(Arc::new(MemoryStorage::new()), EventBus::new());
//!
//! assert_eq!(store.get("cart"), json!([]));
//! store.set("cart", json!([{"productId": 7, "quantity": 1}]));
//! assert_eq!(store.get("cart")[0]["productId"], 7);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod seed;
pub mod storage;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StorageError, StorageResult};
pub use seed::{demo_users, seed_users, users_present};
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
pub use store::StateStore;
