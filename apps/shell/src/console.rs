//! # Headless Console
//!
//! Line commands that stand in for a browser when the shell runs in a
//! terminal.
//!
//! ```text
//! go <module> [json]          navigate-to-module
//! emit <event> [json]         custom event (form submits, cart buttons)
//! login <email> <password>    login-submit
//! logout                      user-logout
//! reload                      re-run the last load
//! show                        print the document
//! state <key>                 print a stored value
//! quit                        exit
//! ```

use std::str::FromStr;

use serde_json::{json, Value};

use crate::error::{ShellError, ShellResult};

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Go { module: String, data: Option<Value> },
    Emit { event: String, detail: Value },
    Login { email: String, password: String },
    Logout,
    Reload,
    Show,
    State { key: String },
    Quit,
    Help,
}

/// Text printed for `help` and unknown commands.
pub const USAGE: &str = "\
commands:
  go <module> [json]        load a module, optionally with a JSON payload
  emit <event> [json]       publish a custom event
  login <email> <password>  submit the login form
  logout                    end the session
  reload                    repeat the last load
  show                      print the document
  state <key>               print a stored value
  quit                      exit";

impl FromStr for ConsoleCommand {
    type Err = ShellError;

    fn from_str(line: &str) -> ShellResult<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb {
            "go" => {
                let (module, data) = name_and_json(rest, "go <module> [json]")?;
                Ok(ConsoleCommand::Go { module, data })
            }
            "emit" => {
                let (event, detail) = name_and_json(rest, "emit <event> [json]")?;
                Ok(ConsoleCommand::Emit {
                    event,
                    detail: detail.unwrap_or_else(|| json!({})),
                })
            }
            "login" => {
                let mut words = rest.split_whitespace();
                match (words.next(), words.next(), words.next()) {
                    (Some(email), Some(password), None) => Ok(ConsoleCommand::Login {
                        email: email.to_string(),
                        password: password.to_string(),
                    }),
                    _ => Err(ShellError::invalid("usage: login <email> <password>")),
                }
            }
            "state" if !rest.is_empty() => Ok(ConsoleCommand::State {
                key: rest.to_string(),
            }),
            "state" => Err(ShellError::invalid("usage: state <key>")),
            "logout" => Ok(ConsoleCommand::Logout),
            "reload" => Ok(ConsoleCommand::Reload),
            "show" => Ok(ConsoleCommand::Show),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            "help" | "?" => Ok(ConsoleCommand::Help),
            other => Err(ShellError::invalid(format!("unknown command '{other}'"))),
        }
    }
}

fn name_and_json(rest: &str, usage: &str) -> ShellResult<(String, Option<Value>)> {
    let (name, json) = match rest.split_once(char::is_whitespace) {
        Some((name, json)) => (name, json.trim()),
        None => (rest, ""),
    };

    if name.is_empty() {
        return Err(ShellError::invalid(format!("usage: {usage}")));
    }

    let data = if json.is_empty() {
        None
    } else {
        let value = serde_json::from_str(json)
            .map_err(|e| ShellError::invalid(format!("invalid JSON payload: {e}")))?;
        Some(value)
    };

    Ok((name.to_string(), data))
}
