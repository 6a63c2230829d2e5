//! # Built-in Page Modules
//!
//! Behavior bundles shipped with the shell.
//!
//! | module      | reads                  | writes   | listens for                         |
//! |-------------|------------------------|----------|-------------------------------------|
//! | `login`     | users                  | -        | `login-submit`                      |
//! | `register`  | users                  | users    | `register-submit`                   |
//! | `catalog`   | products, cart         | cart     | `add-to-cart`, products/cart writes |
//! | `cart`      | cart, products         | cart     | `remove-from-cart`, `clear-cart`    |
//! | `dashboard` | every collection key   | -        | every `state-updated`               |
//!
//! User interaction reaches a module as a custom bus event whose detail is
//! the submitted form or the clicked item.

pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod login;
pub mod register;

use serde_json::Value;

use crate::module::BundleRegistry;

/// `{email, password}`
pub const LOGIN_SUBMIT: &str = "login-submit";

/// `{name, email, password}`
pub const REGISTER_SUBMIT: &str = "register-submit";

/// `{productId}`
pub const ADD_TO_CART: &str = "add-to-cart";

/// `{productId}`
pub const REMOVE_FROM_CART: &str = "remove-from-cart";

/// No detail.
pub const CLEAR_CART: &str = "clear-cart";

/// Registers every built-in module.
pub fn builtin_bundles() -> BundleRegistry {
    let bundles = BundleRegistry::new();
    bundles.register_module("login", || Box::new(login::LoginModule));
    bundles.register_module("register", || Box::new(register::RegisterModule));
    bundles.register_module("catalog", || Box::new(catalog::CatalogModule::default()));
    bundles.register_module("cart", || Box::new(cart::CartModule));
    bundles.register_module("dashboard", || Box::new(dashboard::DashboardModule));
    bundles
}

/// Text field of an event detail, trimmed.
fn text_field<'a>(detail: &'a Value, field: &str) -> Option<&'a str> {
    detail
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// First present field among Spanish and English spellings.
fn either<'a>(record: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields.iter().find_map(|field| record.get(*field))
}

fn product_name(product: &Value) -> String {
    either(product, &["nombre", "name"])
        .and_then(Value::as_str)
        .unwrap_or("Unnamed product")
        .to_string()
}

fn product_price(product: &Value) -> f64 {
    either(product, &["precio", "price"])
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn records(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use showroom_core::EventBus;
    use showroom_store::{MemoryStorage, StateStore};

    use crate::document::DocumentHandle;
    use crate::module::ModuleContext;

    /// A mounted context for `module` over a fresh memory store.
    pub fn mounted(module: &str) -> (ModuleContext, DocumentHandle) {
        let store = Arc::new(StateStore::new(Arc::new(MemoryStorage::new()), EventBus::new()));
        let document = DocumentHandle::new();
        document.lock().claim_container(1);
        (ModuleContext::new(module, 1, store, document.clone()), document)
    }
}
