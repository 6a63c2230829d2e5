//! Cart lines joined with the product list, plus the running total.

use serde_json::{json, Value};
use tracing::debug;

use showroom_core::keys;

use super::{product_name, product_price, records, CLEAR_CART, REMOVE_FROM_CART};
use crate::document::escape_html;
use crate::error::ShellResult;
use crate::module::{ModuleContext, PageModule};

pub struct CartModule;

impl PageModule for CartModule {
    fn init(&self, ctx: &ModuleContext, _payload: Option<Value>) -> ShellResult<()> {
        render(ctx);

        for key in [keys::CART, keys::PRODUCTS] {
            let handler = ctx.clone();
            ctx.subscribe_key(key, move |_| render(&handler));
        }

        let handler = ctx.clone();
        ctx.subscribe(REMOVE_FROM_CART, move |event| {
            let Some(product_id) = event.detail().get("productId").cloned() else {
                return;
            };
            let cart = remove_line(&handler.get(keys::CART), &product_id);
            debug!(product = %product_id, "Removed from cart");
            handler.set(keys::CART, cart);
        });

        let handler = ctx.clone();
        ctx.subscribe(CLEAR_CART, move |_| handler.set(keys::CART, json!([])));

        Ok(())
    }
}

/// Cart without the line for `product_id`.
pub fn remove_line(cart: &Value, product_id: &Value) -> Value {
    Value::Array(
        records(cart)
            .iter()
            .filter(|line| line.get("productId") != Some(product_id))
            .cloned()
            .collect(),
    )
}

/// Sum of price times quantity. Lines whose product is gone count as zero.
pub fn cart_total(cart: &Value, products: &Value) -> f64 {
    records(cart)
        .iter()
        .map(|line| {
            let quantity = line.get("quantity").and_then(Value::as_u64).unwrap_or(0) as f64;
            find_product(products, line.get("productId"))
                .map(|product| product_price(product) * quantity)
                .unwrap_or(0.0)
        })
        .fold(0.0, |total, line| total + line)
}

fn find_product<'a>(products: &'a Value, id: Option<&Value>) -> Option<&'a Value> {
    let id = id?;
    records(products).iter().find(|product| product.get("id") == Some(id))
}

fn render(ctx: &ModuleContext) {
    let cart = ctx.get(keys::CART);
    let products = ctx.get(keys::PRODUCTS);

    let lines: Vec<String> = records(&cart)
        .iter()
        .map(|line| {
            let id = line.get("productId").cloned().unwrap_or(Value::Null);
            let quantity = line.get("quantity").and_then(Value::as_u64).unwrap_or(0);
            let name = find_product(&products, Some(&id))
                .map(product_name)
                .unwrap_or_else(|| "Unavailable product".to_string());
            format!(
                "<li data-product-id=\"{}\">{} x{} <button data-action=\"remove-from-cart\">Remove</button></li>",
                escape_html(&id.to_string()),
                escape_html(&name),
                quantity
            )
        })
        .collect();

    let markup = if lines.is_empty() {
        "<p class=\"empty\">Your cart is empty</p>".to_string()
    } else {
        format!("<ul>\n{}\n</ul>", lines.join("\n"))
    };
    ctx.render("lines", markup);
    ctx.render("total", format!("{:.2}", cart_total(&cart, &products)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::mounted;
    use showroom_core::AppEvent;

    fn products() -> Value {
        json!([
            {"id": 1, "nombre": "Sofá Oslo", "precio": 899.0},
            {"id": 2, "nombre": "Mesa Roble", "precio": 349.5}
        ])
    }

    #[test]
    fn test_total_skips_missing_products() {
        let cart = json!([
            {"productId": 1, "quantity": 1},
            {"productId": 2, "quantity": 2},
            {"productId": 9, "quantity": 5}
        ]);
        assert_eq!(cart_total(&cart, &products()), 1598.0);
        assert_eq!(cart_total(&json!([]), &products()), 0.0);
    }

    #[test]
    fn test_empty_cart_total_is_positive_zero() {
        let total = cart_total(&json!([]), &products());
        assert!(total.is_sign_positive());
        assert_eq!(format!("{total:.2}"), "0.00");

        let unknown_only = cart_total(&json!([{"productId": 9, "quantity": 3}]), &products());
        assert_eq!(format!("{unknown_only:.2}"), "0.00");
    }

    #[test]
    fn test_remove_and_clear_events() {
        let (ctx, document) = mounted("cart");
        ctx.set("products", products());
        ctx.set(
            "cart",
            json!([{"productId": 1, "quantity": 1}, {"productId": 2, "quantity": 2}]),
        );
        CartModule.init(&ctx, None).unwrap();
        assert_eq!(document.region("total").as_deref(), Some("1598.00"));

        ctx.bus().publish(AppEvent::custom(REMOVE_FROM_CART, json!({"productId": 1})));
        assert_eq!(ctx.get("cart"), json!([{"productId": 2, "quantity": 2}]));
        assert_eq!(document.region("total").as_deref(), Some("699.00"));
        assert!(!document.region("lines").unwrap().contains("Oslo"));

        ctx.bus().publish(AppEvent::custom(CLEAR_CART, json!({})));
        assert_eq!(ctx.get("cart"), json!([]));
        assert!(document.region("lines").unwrap().contains("empty"));
        assert_eq!(document.region("total").as_deref(), Some("0.00"));
    }

    #[test]
    fn test_released_instance_stops_listening() {
        let (ctx, _document) = mounted("cart");
        ctx.set("cart", json!([{"productId": 1, "quantity": 1}]));
        CartModule.init(&ctx, None).unwrap();

        assert_eq!(ctx.release_subscriptions(), 4);
        ctx.bus().publish(AppEvent::custom(CLEAR_CART, json!({})));
        assert_eq!(ctx.get("cart"), json!([{"productId": 1, "quantity": 1}]));
    }
}
