//! Sign-in form: checks credentials against `users` and reports the match.

use serde_json::Value;
use tracing::info;

use showroom_core::keys;

use super::{records, text_field, LOGIN_SUBMIT};
use crate::document::escape_html;
use crate::error::ShellResult;
use crate::module::{ModuleContext, PageModule};

const INVALID_CREDENTIALS: &str = "<p class=\"error\">Invalid email or password</p>";

pub struct LoginModule;

impl PageModule for LoginModule {
    fn init(&self, ctx: &ModuleContext, payload: Option<Value>) -> ShellResult<()> {
        let notice = payload
            .as_ref()
            .and_then(|payload| text_field(payload, "message"))
            .map(|message| format!("<p class=\"notice\">{}</p>", escape_html(message)))
            .unwrap_or_default();
        ctx.render("message", notice);

        let handler = ctx.clone();
        ctx.subscribe(LOGIN_SUBMIT, move |event| {
            let detail = event.detail();
            let email = text_field(&detail, "email");
            let password = detail.get("password").and_then(Value::as_str);
            let (Some(email), Some(password)) = (email, password) else {
                handler.render("message", INVALID_CREDENTIALS);
                return;
            };

            match find_user(&handler.get(keys::USERS), email, password) {
                Some(user) => {
                    info!(email, "Credentials accepted");
                    handler.authenticate(user);
                }
                None => {
                    handler.render("message", INVALID_CREDENTIALS);
                }
            }
        });

        Ok(())
    }
}

/// The user whose email matches (case-insensitively) and whose password
/// matches exactly.
pub fn find_user(users: &Value, email: &str, password: &str) -> Option<Value> {
    records(users)
        .iter()
        .find(|user| {
            let email_matches = user
                .get("email")
                .and_then(Value::as_str)
                .is_some_and(|stored| stored.trim().eq_ignore_ascii_case(email));
            let password_matches = user.get("password").and_then(Value::as_str) == Some(password);
            email_matches && password_matches
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::mounted;
    use serde_json::json;
    use showroom_core::{AppEvent, USER_AUTHENTICATED};
    use std::sync::{Arc, Mutex};

    fn users() -> Value {
        json!([
            {"id": "1", "email": "admin@showroom.test", "password": "admin123", "rol": "administrador"},
            {"id": "2", "email": "cliente@showroom.test", "password": "cliente123", "rol": "cliente"}
        ])
    }

    #[test]
    fn test_password_must_match_exactly() {
        assert!(find_user(&users(), "ADMIN@showroom.test", "admin123").is_some());
        assert!(find_user(&users(), "admin@showroom.test", "admin123 ").is_none());
        assert!(find_user(&users(), "admin@showroom.test", "ADMIN123").is_none());
        assert!(find_user(&json!([]), "admin@showroom.test", "admin123").is_none());
    }

    #[test]
    fn test_submit_publishes_user_authenticated() {
        let (ctx, document) = mounted("login");
        ctx.set("users", users());

        let authenticated = Arc::new(Mutex::new(None));
        let sink = authenticated.clone();
        ctx.bus().subscribe(USER_AUTHENTICATED, move |event| {
            *sink.lock().unwrap() = Some(event.detail());
        });

        LoginModule.init(&ctx, None).unwrap();

        ctx.bus().publish(AppEvent::custom(
            LOGIN_SUBMIT,
            json!({"email": "cliente@showroom.test", "password": "wrong"}),
        ));
        assert!(authenticated.lock().unwrap().is_none());
        assert!(document.region("message").unwrap().contains("Invalid"));

        ctx.bus().publish(AppEvent::custom(
            LOGIN_SUBMIT,
            json!({"email": "cliente@showroom.test", "password": "cliente123"}),
        ));
        let detail = authenticated.lock().unwrap().clone().unwrap();
        assert_eq!(detail["user"]["id"], "2");
    }

    #[test]
    fn test_payload_message_is_shown() {
        let (ctx, document) = mounted("login");
        LoginModule
            .init(&ctx, Some(json!({"message": "Session expired"})))
            .unwrap();
        assert!(document.region("message").unwrap().contains("Session expired"));
    }
}
