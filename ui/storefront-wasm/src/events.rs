//! Event binding.
//!
//! Nearly every handler is delegated from `document`, so markup injected
//! later (cart panel, loaded product pages, product detail) needs no
//! rebinding and re-renders never stack listeners.

use crate::cart_ui;
use crate::catalog_ui;
use crate::dom::{self, Elements};
use crate::forms_ui;
use crate::modal;
use crate::page;
use crate::product_detail;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, EventTarget};

/// Attach a listener for the page's lifetime.
pub fn listen(target: &EventTarget, event: &str, handler: impl FnMut(Event) + 'static) {
    let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    if let Err(err) = target.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref()) {
        tracing::warn!("could not bind {}: {:?}", event, err);
    }
    cb.forget();
}

/// Run `handler` with the closest ancestor of the event target matching
/// `selector`, for events bubbling to `document`.
pub fn delegate(event: &str, selector: &'static str, handler: impl Fn(Element, Event) + 'static) {
    let Ok(document) = dom::document() else {
        return;
    };
    listen(&document, event, move |ev: Event| {
        if let Some(el) = dom::event_element(&ev).and_then(|t| dom::closest(&t, selector)) {
            handler(el, ev);
        }
    });
}

/// Delegated click whose handler is async. Default action is suppressed.
macro_rules! on_click_async {
    ($selector:expr, $els:expr, $handler:path) => {{
        let els = $els.clone();
        delegate("click", $selector, move |el: Element, ev: Event| {
            ev.prevent_default();
            let els2 = els.clone();
            wasm_bindgen_futures::spawn_local(async move {
                $handler(&els2, el).await;
            });
        });
    }};
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(els: &Elements) {
    // ── Cart ──
    on_click_async!(".dev_to_cart", els, cart_ui::on_add_to_cart);
    on_click_async!("[data-open=\"dev_modal_cart\"]", els, cart_ui::on_open_cart);
    cart_ui::bind_quantity_controls();
    cart_ui::bind_cart_panel(els);

    // ── Catalog ──
    catalog_ui::bind(els);
    on_click_async!(".section-load-more-btn, #load-more-btn", els, catalog_ui::on_load_more);

    // ── Forms ──
    forms_ui::bind_lead_forms();
    forms_ui::bind_contact_forms();

    // ── Product detail ──
    on_click_async!(".dev_product_detail", els, product_detail::on_open);

    // ── Modals and page chrome ──
    modal::bind_triggers();
    page::bind(els);
}
