//! Admin overview: record counts per collection, refreshed on every write.

use serde_json::Value;

use showroom_core::{keys, STATE_UPDATED};

use super::records;
use crate::document::escape_html;
use crate::error::ShellResult;
use crate::module::{ModuleContext, PageModule};

pub struct DashboardModule;

impl PageModule for DashboardModule {
    fn init(&self, ctx: &ModuleContext, _payload: Option<Value>) -> ShellResult<()> {
        let greeting = match ctx.store().current_session() {
            Some(session) => format!("Welcome, {}", escape_html(&session.name)),
            None => "Welcome".to_string(),
        };
        ctx.render("greeting", greeting);
        render_counts(ctx);

        let handler = ctx.clone();
        ctx.subscribe(STATE_UPDATED, move |_| render_counts(&handler));

        Ok(())
    }
}

fn render_counts(ctx: &ModuleContext) {
    let rows: Vec<String> = keys::ALL
        .iter()
        .map(|key| {
            let count = records(&ctx.get(key)).len();
            format!("<tr data-key=\"{key}\"><th>{key}</th><td>{count}</td></tr>")
        })
        .collect();
    ctx.render("counts", format!("<table>\n{}\n</table>", rows.join("\n")));
}
