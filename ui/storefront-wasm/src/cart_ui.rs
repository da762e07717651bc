//! Cart wiring: add-to-cart buttons, quantity steppers, the cart panel and
//! header counters.

use crate::dom::{self, Elements};
use crate::events::{delegate, listen};
use crate::forms_ui::render_form_message;
use crate::state;
use shop_api_types::{CartSnapshot, ProductId};
use shop_core::price::QuantityBounds;
use shop_core::{render, FormOutcome, Notifier, OrderForm, ProductSource};
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlFormElement, HtmlInputElement};

/// Failures that need the shopper's attention go to a blocking alert.
pub struct AlertNotifier;

impl Notifier for AlertNotifier {
    fn alert(&self, message: &str) {
        dom::alert(message);
    }
}

fn bounds() -> QuantityBounds {
    let cfg = state::config();
    QuantityBounds {
        min: cfg.min_quantity,
        max: cfg.max_quantity,
    }
}

/// Regenerate counters and panel from a snapshot.
pub fn render_cart(els: &Elements, cart: &CartSnapshot) {
    let (count, amount) = render::counters(cart);
    for el in dom::query_all(".dev_count_cart") {
        dom::set_text(&el, &count);
    }
    for el in dom::query_all(".dev_price_cart") {
        dom::set_text(&el, &amount);
    }
    if let Some(container) = &els.cart_container {
        dom::set_inner_html(container, &render::cart_modal(cart));
    }
}

// ── Add to cart ──

fn text_in(card: &Element, selector: &str) -> Option<String> {
    dom::query_within(card, selector).map(|el| dom::text(&el))
}

fn product_source(btn: &Element) -> ProductSource {
    let card = dom::closest(btn, ".product-box");
    let card_text = |selector: &str| card.as_ref().and_then(|c| text_in(c, selector));
    ProductSource {
        data_product_id: dom::data(btn, "product-id"),
        data_id: dom::data(btn, "id"),
        data_title: dom::data(btn, "title"),
        data_sku: dom::data(btn, "sku"),
        data_price: dom::data(btn, "price"),
        card_title: card_text(".product-box__title"),
        card_image_alt: card
            .as_ref()
            .and_then(|c| dom::query_within(c, ".product-box__photo img"))
            .and_then(|img| img.get_attribute("alt")),
        card_sku_label: card_text(".product-box__sku"),
        card_price_label: card_text(".product-box__price-value"),
    }
}

pub async fn on_add_to_cart(_els: &Elements, btn: Element) {
    let Some(cart) = state::cart() else {
        return;
    };
    let input = dom::closest(&btn, ".product-box").and_then(|card| {
        dom::query_within(&card, ".product-count")
            .or_else(|| dom::query_within(&card, "input[type=\"number\"]"))
    });
    let typed = input.as_ref().map(dom::value_of);
    let quantity = bounds().for_add(typed.as_deref(), dom::data(&btn, "quantity").as_deref());
    cart.add_to_cart(&product_source(&btn), quantity).await;
}

pub async fn on_open_cart(_els: &Elements, _trigger: Element) {
    if let Some(cart) = state::cart() {
        cart.fetch_cart().await;
    }
}

// ── Quantity controls ──

fn quantity_input(button: &Element) -> Option<HtmlInputElement> {
    button
        .parent_element()
        .and_then(|p| dom::query_within(&p, "input.product-count"))
        .or_else(|| {
            dom::closest(button, ".product-box__qty")
                .and_then(|q| dom::query_within(&q, "input.product-count"))
        })
        .or_else(|| {
            dom::closest(button, ".product-box")
                .and_then(|b| dom::query_within(&b, "input.product-count"))
        })
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
}

fn step(button: &Element, delta: i64) {
    let Some(input) = quantity_input(button) else {
        return;
    };
    input.set_value(&bounds().step(&input.value(), delta).to_string());
    if let Ok(change) = Event::new("change") {
        let _ = input.dispatch_event(&change);
    }
}

pub fn bind_quantity_controls() {
    delegate("click", ".button-qty[data-action=\"increase\"]", |btn, _| step(&btn, 1));
    delegate("click", ".button-qty[data-action=\"decrease\"]", |btn, _| step(&btn, -1));
    delegate("change", ".product-count", |el, _| {
        if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
            input.set_value(&bounds().clamp_input(&input.value()).to_string());
        }
    });
}

// ── Cart panel ──

/// One click and one submit listener on the panel container; the panel's
/// markup is replaced on every render.
pub fn bind_cart_panel(els: &Elements) {
    let Some(container) = els.cart_container.clone() else {
        return;
    };

    listen(&container, "click", |ev: Event| {
        let Some(target) = dom::event_element(&ev) else {
            return;
        };
        let Some(cart) = state::cart() else {
            return;
        };
        if let Some(btn) = dom::closest(&target, "[data-action=\"remove\"]") {
            let Some(id) = dom::data(&btn, "product-id").and_then(|raw| ProductId::parse(&raw)) else {
                return;
            };
            wasm_bindgen_futures::spawn_local(async move {
                cart.remove_from_cart(&id).await;
            });
        } else if dom::closest(&target, "[data-action=\"clear-cart\"]").is_some() {
            wasm_bindgen_futures::spawn_local(async move {
                cart.clear_cart().await;
            });
        }
    });

    let els2 = els.clone();
    listen(&container, "submit", move |ev: Event| {
        let Some(form) = dom::event_element(&ev).and_then(|t| dom::closest(&t, "[data-role=\"order-form\"]")) else {
            return;
        };
        ev.prevent_default();
        let els3 = els2.clone();
        wasm_bindgen_futures::spawn_local(async move {
            on_order_submit(&els3, form).await;
        });
    });
}

async fn on_order_submit(els: &Elements, form: Element) {
    let Some(cart) = state::cart() else {
        return;
    };
    if dom::has_class(&form, "is-loading") {
        return;
    }
    let order = OrderForm {
        name: dom::field(&form, "name"),
        phone: dom::field(&form, "phone"),
        email: dom::field(&form, "email"),
        comment: dom::field(&form, "comment"),
    };

    dom::add_class(&form, "is-loading");
    render_form_message(&form, "", true);
    let outcome = cart.submit_order(&order).await;
    dom::remove_class(&form, "is-loading");

    match &outcome {
        FormOutcome::Invalid(err) => {
            render_form_message(&form, &outcome.message(), false);
            if let Some(field) = err.field().and_then(|f| dom::query_within(&form, &format!("[name=\"{f}\"]"))) {
                dom::focus(&field);
            }
        }
        FormOutcome::Sent(message) => {
            if let Some(f) = form.dyn_ref::<HtmlFormElement>() {
                f.reset();
            }
            // The refetch usually re-rendered the panel and dropped this form.
            if form.is_connected() {
                render_form_message(&form, message, true);
            } else if let Some(container) = &els.cart_container {
                if let Ok(note) = dom::create_element("div") {
                    dom::add_class(&note, "form-box__message");
                    dom::add_class(&note, "is-success");
                    dom::set_text(&note, message);
                    let _ = container.append_child(&note);
                }
            }
        }
        FormOutcome::Failed(message) => render_form_message(&form, message, false),
    }
}
