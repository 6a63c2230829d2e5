//! Product list with add-to-cart.
//!
//! Payload: `{"category": "sofas"}` narrows the list.

use serde_json::{json, Value};
use tracing::debug;

use showroom_core::keys;

use super::{either, product_name, product_price, records, text_field, ADD_TO_CART};
use crate::document::escape_html;
use crate::error::ShellResult;
use crate::module::{ModuleContext, PageModule};

#[derive(Debug, Default)]
pub struct CatalogModule;

impl PageModule for CatalogModule {
    fn init(&self, ctx: &ModuleContext, payload: Option<Value>) -> ShellResult<()> {
        let category: Option<String> = payload
            .as_ref()
            .and_then(|payload| text_field(payload, "category"))
            .map(str::to_string);

        render_products(ctx, category.as_deref());
        render_cart_count(ctx);

        let handler = ctx.clone();
        ctx.subscribe_key(keys::PRODUCTS, move |_| {
            render_products(&handler, category.as_deref());
        });

        let handler = ctx.clone();
        ctx.subscribe_key(keys::CART, move |_| render_cart_count(&handler));

        let handler = ctx.clone();
        ctx.subscribe(ADD_TO_CART, move |event| {
            let Some(product_id) = event.detail().get("productId").cloned() else {
                return;
            };
            let cart = add_to_cart(&handler.get(keys::CART), &product_id);
            debug!(product = %product_id, "Added to cart");
            handler.set(keys::CART, cart);
        });

        Ok(())
    }
}

/// Cart with one more unit of `product_id`.
pub fn add_to_cart(cart: &Value, product_id: &Value) -> Value {
    let mut lines = records(cart).to_vec();

    match lines
        .iter_mut()
        .find(|line| line.get("productId") == Some(product_id))
    {
        Some(line) => {
            let quantity = line.get("quantity").and_then(Value::as_u64).unwrap_or(0);
            line["quantity"] = json!(quantity + 1);
        }
        None => lines.push(json!({"productId": product_id, "quantity": 1})),
    }

    Value::Array(lines)
}

fn render_products(ctx: &ModuleContext, category: Option<&str>) {
    let products = ctx.get(keys::PRODUCTS);
    let items: Vec<String> = records(&products)
        .iter()
        .filter(|product| match category {
            Some(wanted) => either(product, &["categoria", "category"])
                .and_then(Value::as_str)
                .is_some_and(|c| c.eq_ignore_ascii_case(wanted)),
            None => true,
        })
        .map(|product| {
            let id = product.get("id").cloned().unwrap_or(Value::Null);
            format!(
                "<li data-product-id=\"{}\">{} <span class=\"price\">{:.2}</span> <button data-action=\"add-to-cart\">Add</button></li>",
                escape_html(&id.to_string()),
                escape_html(&product_name(product)),
                product_price(product)
            )
        })
        .collect();

    let markup = if items.is_empty() {
        "<p class=\"empty\">No products available</p>".to_string()
    } else {
        format!("<ul>\n{}\n</ul>", items.join("\n"))
    };
    ctx.render("products", markup);
}

fn render_cart_count(ctx: &ModuleContext) {
    let units: u64 = records(&ctx.get(keys::CART))
        .iter()
        .filter_map(|line| line.get("quantity").and_then(Value::as_u64))
        .sum();
    ctx.render("cart-count", units.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::mounted;
    use showroom_core::AppEvent;

    fn products() -> Value {
        json!([
            {"id": 1, "nombre": "Sofá Oslo", "precio": 899.0, "categoria": "sofas"},
            {"id": 2, "nombre": "Mesa Roble", "precio": 349.5, "categoria": "mesas"}
        ])
    }

    #[test]
    fn test_add_to_cart_increments_existing_line() {
        let cart = add_to_cart(&json!([]), &json!(1));
        let cart = add_to_cart(&cart, &json!(2));
        let cart = add_to_cart(&cart, &json!(1));

        assert_eq!(
            cart,
            json!([{"productId": 1, "quantity": 2}, {"productId": 2, "quantity": 1}])
        );
    }

    #[test]
    fn test_category_payload_filters_products() {
        let (ctx, document) = mounted("catalog");
        ctx.set("products", products());

        CatalogModule.init(&ctx, Some(json!({"category": "sofas"}))).unwrap();

        let list = document.region("products").unwrap();
        assert!(list.contains("Oslo"));
        assert!(!list.contains("Roble"));
    }

    #[test]
    fn test_add_to_cart_event_updates_store_and_badge() {
        let (ctx, document) = mounted("catalog");
        ctx.set("products", products());
        CatalogModule.init(&ctx, None).unwrap();
        assert_eq!(document.region("cart-count").as_deref(), Some("0"));

        ctx.bus().publish(AppEvent::custom(ADD_TO_CART, json!({"productId": 2})));
        ctx.bus().publish(AppEvent::custom(ADD_TO_CART, json!({"productId": 2})));

        assert_eq!(ctx.get("cart"), json!([{"productId": 2, "quantity": 2}]));
        assert_eq!(document.region("cart-count").as_deref(), Some("2"));
    }

    #[test]
    fn test_product_writes_rerender_list() {
        let (ctx, document) = mounted("catalog");
        CatalogModule.init(&ctx, None).unwrap();
        assert!(document.region("products").unwrap().contains("No products"));

        ctx.set("products", products());
        assert!(document.region("products").unwrap().contains("Mesa Roble"));
    }
}
