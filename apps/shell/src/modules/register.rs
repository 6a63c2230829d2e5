//! Account creation: appends a `cliente` user and logs it in.

use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use showroom_core::keys;

use super::{records, text_field, REGISTER_SUBMIT};
use crate::document::escape_html;
use crate::error::{ShellError, ShellResult};
use crate::module::{ModuleContext, PageModule};

pub struct RegisterModule;

impl PageModule for RegisterModule {
    fn init(&self, ctx: &ModuleContext, _payload: Option<Value>) -> ShellResult<()> {
        ctx.render("message", "");

        let handler = ctx.clone();
        ctx.subscribe(REGISTER_SUBMIT, move |event| {
            let users = handler.get(keys::USERS);

            match new_user(&users, &event.detail()) {
                Ok(user) => {
                    let mut updated = records(&users).to_vec();
                    updated.push(user.clone());
                    handler.set(keys::USERS, Value::Array(updated));

                    info!(email = ?user.get("email"), "Account created");
                    handler.authenticate(user);
                }
                Err(e) => {
                    let markup = format!("<p class=\"error\">{}</p>", escape_html(&e.to_string()));
                    handler.render("message", markup);
                }
            }
        });

        Ok(())
    }
}

/// Builds the user record for a registration form.
///
/// ## Errors
/// `InvalidInput` if a field is missing, the email has no `@`, or the email
/// is already taken.
pub fn new_user(users: &Value, form: &Value) -> ShellResult<Value> {
    let name = text_field(form, "name").ok_or_else(|| ShellError::invalid("Name is required"))?;
    let email = text_field(form, "email").ok_or_else(|| ShellError::invalid("Email is required"))?;
    let password = form
        .get("password")
        .and_then(Value::as_str)
        .filter(|password| !password.is_empty())
        .ok_or_else(|| ShellError::invalid("Password is required"))?;

    if !email.contains('@') {
        return Err(ShellError::invalid("Email is not valid"));
    }

    let taken = records(users).iter().any(|user| {
        user.get("email")
            .and_then(Value::as_str)
            .is_some_and(|stored| stored.trim().eq_ignore_ascii_case(email))
    });
    if taken {
        return Err(ShellError::invalid("An account with this email already exists"));
    }

    Ok(json!({
        "id": Uuid::new_v4().to_string(),
        "nombre": name,
        "email": email,
        "password": password,
        "rol": "cliente"
    }))
}
