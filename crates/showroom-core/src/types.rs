//! # Contract Types
//!
//! Types shared by the shell and every page module.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Contract Types                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Session      │   │ModuleDescriptor │   │NavigationRequest│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  name           │   │  module         │       │
//! │  │  name           │   │  markup_path    │   │  data?          │       │
//! │  │  role           │   │  style_path     │   └─────────────────┘       │
//! │  │  authenticated  │   │  script_path    │                             │
//! │  └─────────────────┘   │  title          │   ┌─────────────────┐       │
//! │                        └─────────────────┘   │  StateChange    │       │
//! │  ┌─────────────────┐                         │  ─────────────  │       │
//! │  │      Role       │                         │  key            │       │
//! │  │  Administrador  │                         │  value          │       │
//! │  │  Cliente        │                         └─────────────────┘       │
//! │  │  Other(String)  │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! State values are untyped JSON on purpose: shape correctness is a contract
//! between the producing and consuming page modules, not the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Well-Known State Keys
// =============================================================================

/// State keys used by the bundled page modules.
///
/// Keys are open-ended; any module may introduce a new one. These exist so
/// the shell can hydrate the common collections at startup.
pub mod keys {
    pub const CART: &str = "cart";
    pub const PRODUCTS: &str = "products";
    pub const ORDERS: &str = "orders";
    pub const USERS: &str = "users";
    pub const INVENTORY: &str = "inventory";
    pub const PAYMENTS: &str = "payments";
    pub const SUPPLIERS: &str = "suppliers";

    /// Every well-known key, in hydration order.
    pub const ALL: [&str; 7] = [CART, PRODUCTS, ORDERS, USERS, INVENTORY, PAYMENTS, SUPPLIERS];
}

/// Returns the empty default every unknown key reads as.
#[inline]
pub fn empty_state() -> Value {
    Value::Array(Vec::new())
}

// =============================================================================
// Role
// =============================================================================

/// The role of an authenticated principal.
///
/// The set is open: unknown strings are kept verbatim in `Other` so a
/// newly introduced role survives a persistence round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Back-office staff. Lands on the dashboard.
    Administrador,
    /// Storefront customer. Lands on the catalog.
    Cliente,
    /// Any other role string.
    Other(String),
}

impl Role {
    /// Returns the canonical wire string.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Administrador => "administrador",
            Role::Cliente => "cliente",
            Role::Other(role) => role,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Cliente
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.trim().to_lowercase().as_str() {
            "administrador" | "admin" => Role::Administrador,
            "cliente" | "client" | "customer" => Role::Cliente,
            _ => Role::Other(role),
        }
    }
}

impl From<&str> for Role {
    fn from(role: &str) -> Self {
        Role::from(role.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Session
// =============================================================================

/// The currently authenticated principal.
///
/// ## Lifecycle
/// ```text
/// user-authenticated ──► Session stored + persisted ──► reload resumes it
///                                   │
///                         user-logout ──► cleared + durable entry removed
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Identity of the user record this session was created from.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Login email, when the user record has one.
    #[serde(default)]
    pub email: Option<String>,

    /// Role used for routing.
    #[serde(default)]
    #[ts(as = "String")]
    pub role: Role,

    /// When the login happened.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub authenticated_at: Option<DateTime<Utc>>,

    /// Remaining fields of the user record (credentials are never kept).
    #[serde(default, flatten)]
    #[ts(skip)]
    pub attributes: Map<String, Value>,
}

impl Session {
    /// Creates a session with no extra attributes.
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<Role>) -> Self {
        Session {
            id: id.into(),
            name: name.into(),
            email: None,
            role: role.into(),
            authenticated_at: Some(Utc::now()),
            attributes: Map::new(),
        }
    }

    /// Builds a session from a user record as page modules store it.
    ///
    /// ## Accepted Shapes
    /// - `id`: string or number
    /// - `name`, `nombre` or `username`: display name (falls back to email)
    /// - `rol` or `role`: role string (defaults to `cliente`)
    ///
    /// The `password` field is dropped.
    pub fn from_user_record(record: &Value) -> CoreResult<Self> {
        let object = record.as_object().ok_or_else(|| CoreError::InvalidPayload {
            event: crate::events::USER_AUTHENTICATED.to_string(),
            reason: "user must be an object".to_string(),
        })?;

        let id = match object.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(CoreError::InvalidPayload {
                    event: crate::events::USER_AUTHENTICATED.to_string(),
                    reason: "user has no id".to_string(),
                })
            }
        };

        let text = |field: &str| object.get(field).and_then(Value::as_str).map(str::to_string);
        let email = text("email");
        let name = text("name")
            .or_else(|| text("nombre"))
            .or_else(|| text("username"))
            .or_else(|| email.clone())
            .unwrap_or_else(|| id.clone());
        let role = text("rol")
            .or_else(|| text("role"))
            .map(Role::from)
            .unwrap_or_default();

        let attributes = object
            .iter()
            .filter(|(field, _)| {
                !matches!(
                    field.as_str(),
                    "id" | "name" | "nombre" | "username" | "email" | "rol" | "role" | "password"
                )
            })
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();

        Ok(Session {
            id,
            name,
            email,
            role,
            authenticated_at: Some(Utc::now()),
            attributes,
        })
    }

    /// Returns true if the session's role is in `admin_roles`.
    pub fn is_admin_of(&self, admin_roles: &[String]) -> bool {
        admin_roles
            .iter()
            .any(|role| Role::from(role.as_str()) == self.role)
    }
}

// =============================================================================
// Module Descriptor
// =============================================================================

/// Where to fetch a page module's three resources, plus its window title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    /// Unique module name used in navigation requests.
    pub name: String,
    /// Markup resource path.
    pub markup_path: String,
    /// Stylesheet resource path.
    pub style_path: String,
    /// Behavior bundle path.
    pub script_path: String,
    /// Document title while the module is mounted.
    pub title: String,
}

impl ModuleDescriptor {
    /// Creates a descriptor with explicit resource paths.
    pub fn new(
        name: impl Into<String>,
        markup_path: impl Into<String>,
        style_path: impl Into<String>,
        script_path: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        ModuleDescriptor {
            name: name.into(),
            markup_path: markup_path.into(),
            style_path: style_path.into(),
            script_path: script_path.into(),
            title: title.into(),
        }
    }

    /// Creates a descriptor using the `modules/<name>/<name>.{html,css,js}`
    /// layout.
    pub fn conventional(name: &str, title: impl Into<String>) -> Self {
        ModuleDescriptor::new(
            name,
            format!("modules/{name}/{name}.html"),
            format!("modules/{name}/{name}.css"),
            format!("modules/{name}/{name}.js"),
            title,
        )
    }
}

// =============================================================================
// Event Payloads
// =============================================================================

/// Payload of `navigate-to-module`. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NavigationRequest {
    /// Target module name.
    pub module: String,
    /// Optional payload handed to the target's `init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "unknown")]
    pub data: Option<Value>,
}

impl NavigationRequest {
    /// Creates a navigation request without payload.
    pub fn to(module: impl Into<String>) -> Self {
        NavigationRequest {
            module: module.into(),
            data: None,
        }
    }

    /// Attaches a payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Payload of `state-updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StateChange {
    /// The key that was written.
    pub key: String,
    /// The value now stored under it.
    #[ts(type = "unknown")]
    pub value: Value,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from("administrador"), Role::Administrador);
        assert_eq!(Role::from("ADMIN"), Role::Administrador);
        assert_eq!(Role::from("cliente"), Role::Cliente);
        assert_eq!(Role::from("proveedor"), Role::Other("proveedor".into()));
        assert_eq!(Role::default(), Role::Cliente);
    }

    #[test]
    fn test_role_serializes_as_string() {
        let session = Session::new("1", "Ana", Role::Administrador);
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["role"], "administrador");

        let back: Session = serde_json::from_value(value).unwrap();
        assert_eq!(back.role, Role::Administrador);
    }

    #[test]
    fn test_session_from_user_record() {
        let record = json!({
            "id": 7,
            "nombre": "Lucía",
            "email": "lucia@example.com",
            "password": "secret",
            "rol": "administrador",
            "telefono": "555-0101"
        });

        let session = Session::from_user_record(&record).unwrap();
        assert_eq!(session.id, "7");
        assert_eq!(session.name, "Lucía");
        assert_eq!(session.email.as_deref(), Some("lucia@example.com"));
        assert_eq!(session.role, Role::Administrador);
        assert!(session.attributes.contains_key("telefono"));
        assert!(!session.attributes.contains_key("password"));
    }

    #[test]
    fn test_session_from_user_record_rejects_missing_id() {
        assert!(Session::from_user_record(&json!({"name": "x"})).is_err());
        assert!(Session::from_user_record(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_session_is_admin_of() {
        let admin_roles = vec!["administrador".to_string()];
        assert!(Session::new("1", "a", "admin").is_admin_of(&admin_roles));
        assert!(!Session::new("2", "b", "cliente").is_admin_of(&admin_roles));
    }

    #[test]
    fn test_conventional_descriptor_paths() {
        let descriptor = ModuleDescriptor::conventional("catalog", "Catalog");
        assert_eq!(descriptor.markup_path, "modules/catalog/catalog.html");
        assert_eq!(descriptor.style_path, "modules/catalog/catalog.css");
        assert_eq!(descriptor.script_path, "modules/catalog/catalog.js");
    }

    #[test]
    fn test_navigation_request_omits_empty_data() {
        let value = serde_json::to_value(NavigationRequest::to("cart")).unwrap();
        assert_eq!(value, json!({"module": "cart"}));
    }
}
