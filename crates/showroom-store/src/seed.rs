//! # User Seeding
//!
//! Puts a first set of user records into an empty store so the login module
//! has someone to authenticate.
//!
//! ## When Seeding Happens
//! ```text
//! bootstrap
//!    │
//!    ├─ get("users") non-empty ──► nothing to do
//!    │
//!    └─ get("users") empty ──► seed document fetched?
//!                                 ├─ yes ──► seed_users(store, records)
//!                                 └─ no  ──► seed_users(store, demo_users())
//! ```

use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use showroom_core::keys;

use crate::store::StateStore;

/// Built-in accounts used when no seed document is available.
///
/// | email                   | password    | role          |
/// |-------------------------|-------------|---------------|
/// | admin@showroom.test     | admin123    | administrador |
/// | cliente@showroom.test   | cliente123  | cliente       |
pub fn demo_users() -> Vec<Value> {
    vec![
        json!({
            "id": "1",
            "nombre": "Administrador",
            "email": "admin@showroom.test",
            "password": "admin123",
            "rol": "administrador"
        }),
        json!({
            "id": "2",
            "nombre": "Cliente Demo",
            "email": "cliente@showroom.test",
            "password": "cliente123",
            "rol": "cliente"
        }),
    ]
}

/// Whether the `users` key already holds anything besides an empty list.
pub fn users_present(store: &StateStore) -> bool {
    match store.get(keys::USERS) {
        Value::Array(users) => !users.is_empty(),
        Value::Null => false,
        _ => true,
    }
}

/// Writes `records` to the `users` key if it holds no users yet.
///
/// Records without an `id` get a random one. Non-object records are dropped.
/// Returns the number of users written (0 when the key was already populated).
pub fn seed_users(store: &StateStore, records: Vec<Value>) -> usize {
    if users_present(store) {
        debug!("Users already present, skipping seed");
        return 0;
    }

    let users: Vec<Value> = records
        .into_iter()
        .filter_map(|record| match record {
            Value::Object(mut user) => {
                if !user.contains_key("id") {
                    user.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
                }
                Some(Value::Object(user))
            }
            _ => None,
        })
        .collect();

    let count = users.len();
    store.set(keys::USERS, Value::Array(users));

    info!(count, "Seeded users");
    count
}
