//! Page chrome: FAQ accordion and the off-canvas close button.

use crate::dom::{self, Elements};
use crate::events::delegate;
use crate::modal::Foundation;
use crate::state;
use shop_core::Accordion;
use tracing::{debug, warn};
use web_sys::Element;

// ── FAQ ──

fn faq_body(box_el: &Element) -> Option<Element> {
    dom::query_within(box_el, ".faq-box__body")
}

/// Show exactly the items the accordion holds open.
pub fn render_faq() {
    let boxes = dom::query_all(".faq-box");
    state::with(|s| {
        for (index, box_el) in boxes.iter().enumerate() {
            let open = s.faq.is_open(index);
            dom::toggle_class(box_el, "is-open", open);
            if let Some(body) = faq_body(box_el) {
                dom::set_visible(&body, open);
            }
        }
    });
}

fn on_faq_head(head: &Element) {
    let Some(box_el) = dom::closest(head, ".faq-box") else {
        return;
    };
    let Some(index) = dom::query_all(".faq-box").iter().position(|b| *b == box_el) else {
        return;
    };
    let transition = state::with_mut(|s| s.faq.toggle(index));
    debug!(index, ?transition, "faq");
    render_faq();
}

// ── Off-canvas ──

/// Close through the `OffCanvas` plugin bound to the panel, if there is one.
fn close_with_plugin(panel: &Element) -> bool {
    let Some(foundation) = Foundation::detect() else {
        return false;
    };
    match foundation.plugin(panel, "OffCanvas") {
        Ok(Some(plugin)) => match Foundation::call(&plugin, "close") {
            Ok(()) => true,
            Err(err) => {
                warn!("off-canvas plugin close failed: {}", err);
                false
            }
        },
        Ok(None) => false,
        Err(err) => {
            warn!("off-canvas plugin lookup failed: {}", err);
            false
        }
    }
}

fn close_off_canvas(els: &Elements, button: &Element) {
    let Some(panel) = dom::closest(button, ".off-canvas") else {
        return;
    };
    if close_with_plugin(&panel) {
        debug!("off-canvas closed by plugin");
        return;
    }
    dom::remove_class(&panel, "is-open");
    dom::remove_class(&els.body, "off-canvas-active");
}

pub fn bind(els: &Elements) {
    // Every answer starts closed.
    let count = dom::query_all(".faq-box").len();
    state::with_mut(|s| s.faq = Accordion::new(count));
    render_faq();
    delegate("click", ".faq-box__head", |head, ev| {
        ev.prevent_default();
        on_faq_head(&head);
    });

    let els = els.clone();
    delegate("click", ".canvas-box__close", move |button, ev| {
        ev.prevent_default();
        close_off_canvas(&els, &button);
    });
}
