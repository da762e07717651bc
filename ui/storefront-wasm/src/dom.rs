//! DOM helpers and element bindings.
//!
//! Page regions differ between templates (the cart panel or product grid may
//! be absent), so most bindings are optional. Only `<body>` is required.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, HtmlDocument, HtmlElement, HtmlInputElement, HtmlTextAreaElement,
    Window,
};

// ── Helpers ──

fn doc() -> Option<Document> {
    web_sys::window()?.document()
}

pub fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

pub fn document() -> Result<Document, JsValue> {
    doc().ok_or_else(|| JsValue::from_str("no document"))
}

pub fn by_id(id: &str) -> Option<Element> {
    doc()?.get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn query(selector: &str) -> Option<Element> {
    doc()?.query_selector(selector).ok()?
}

fn collect(nl: web_sys::NodeList) -> Vec<Element> {
    let mut v = Vec::new();
    for i in 0..nl.length() {
        if let Some(el) = nl.item(i).and_then(|n| n.dyn_into::<Element>().ok()) {
            v.push(el);
        }
    }
    v
}

pub fn query_all(selector: &str) -> Vec<Element> {
    doc()
        .and_then(|d| d.query_selector_all(selector).ok())
        .map(collect)
        .unwrap_or_default()
}

/// Query all matching elements within a parent element.
pub fn query_all_within(parent: &Element, selector: &str) -> Vec<Element> {
    parent
        .query_selector_all(selector)
        .ok()
        .map(collect)
        .unwrap_or_default()
}

pub fn query_within(parent: &Element, selector: &str) -> Option<Element> {
    parent.query_selector(selector).ok()?
}

pub fn closest(el: &Element, selector: &str) -> Option<Element> {
    el.closest(selector).ok()?
}

/// The element an event was dispatched to, if it is an element.
pub fn event_element(ev: &Event) -> Option<Element> {
    ev.target()?.dyn_into::<Element>().ok()
}

/// Trimmed, non-empty `data-*` attribute.
pub fn data(el: &Element, name: &str) -> Option<String> {
    el.get_attribute(&format!("data-{name}"))
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub fn data_id(el: &Element, name: &str) -> Option<u64> {
    data(el, name)?.parse().ok().filter(|id| *id != 0)
}

pub fn text(el: &Element) -> String {
    el.text_content().unwrap_or_default().trim().to_owned()
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn set_inner_html(el: &Element, html: &str) {
    el.set_inner_html(html);
}

pub fn add_class(el: &Element, cls: &str) {
    let _ = el.class_list().add_1(cls);
}

pub fn remove_class(el: &Element, cls: &str) {
    let _ = el.class_list().remove_1(cls);
}

pub fn toggle_class(el: &Element, cls: &str, force: bool) {
    let _ = el.class_list().toggle_with_force(cls, force);
}

pub fn has_class(el: &Element, cls: &str) -> bool {
    el.class_list().contains(cls)
}

pub fn set_style(el: &Element, prop: &str, value: &str) {
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        let _ = html.style().set_property(prop, value);
    }
}

pub fn style(el: &Element, prop: &str) -> String {
    el.dyn_ref::<HtmlElement>()
        .and_then(|h| h.style().get_property_value(prop).ok())
        .unwrap_or_default()
}

/// Computed visibility, so stylesheet-hidden elements count as hidden.
pub fn is_displayed(el: &Element) -> bool {
    window()
        .ok()
        .and_then(|w| w.get_computed_style(el).ok().flatten())
        .and_then(|s| s.get_property_value("display").ok())
        .is_none_or(|display| display != "none")
}

/// Show with the stylesheet's display, falling back to `block` when the
/// stylesheet itself hides the element.
pub fn show(el: &Element) {
    set_style(el, "display", "");
    if !is_displayed(el) {
        set_style(el, "display", "block");
    }
}

pub fn set_visible(el: &Element, visible: bool) {
    if visible {
        show(el);
    } else {
        set_style(el, "display", "none");
    }
}

pub fn set_display(el: &Element, display: &str) {
    set_style(el, "display", display);
}

pub fn create_element(tag: &str) -> Result<Element, JsValue> {
    document()?.create_element(tag)
}

/// Value of an `<input>` or `<textarea>`, trimmed.
pub fn value_of(el: &Element) -> String {
    if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        return input.value().trim().to_owned();
    }
    if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
        return area.value().trim().to_owned();
    }
    String::new()
}

/// Value of the named field inside a form, or empty.
pub fn field(form: &Element, name: &str) -> String {
    query_within(form, &format!("[name=\"{name}\"]"))
        .map(|el| value_of(&el))
        .unwrap_or_default()
}

pub fn focus(el: &Element) {
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        let _ = html.focus();
    }
}

pub fn set_disabled(el: &Element, disabled: bool) {
    if disabled {
        let _ = el.set_attribute("disabled", "disabled");
    } else {
        let _ = el.remove_attribute("disabled");
    }
}

pub fn cookies() -> String {
    doc()
        .and_then(|d| d.dyn_into::<HtmlDocument>().ok())
        .and_then(|d| d.cookie().ok())
        .unwrap_or_default()
}

pub fn alert(message: &str) {
    if let Ok(w) = window() {
        let _ = w.alert_with_message(message);
    }
}

pub fn scroll_y() -> f64 {
    window().and_then(|w| w.scroll_y()).unwrap_or(0.0)
}

pub fn scroll_to(y: f64) {
    if let Ok(w) = window() {
        w.scroll_to_with_x_and_y(0.0, y.max(0.0));
    }
}

/// Scroll so that `el` sits `offset` pixels below the viewport top.
pub fn scroll_to_element(el: &Element, offset: i32) {
    let top = el.get_bounding_client_rect().top() + scroll_y();
    scroll_to(top - f64::from(offset));
}

// ── Elements struct ──

/// Page regions used across modules, resolved once at startup.
/// Clone-friendly (all inner types are reference-counted via JS GC).
#[derive(Clone)]
pub struct Elements {
    pub html: Element,
    pub body: HtmlElement,

    // Cart
    pub cart_container: Option<Element>,

    // Catalog
    pub catalog_anchor: Option<Element>,
    pub products_container: Option<Element>,
    pub load_more_btn: Option<Element>,
    pub load_more_container: Option<Element>,
    pub show_more_btn: Option<Element>,
    pub remaining_count: Option<Element>,

    // Product detail
    pub product_modal_content: Option<Element>,
}

impl Elements {
    /// Resolve all DOM references. Call once after the module starts.
    pub fn bind() -> Result<Elements, JsValue> {
        let document = document()?;
        Ok(Elements {
            html: document
                .document_element()
                .ok_or_else(|| JsValue::from_str("missing <html>"))?,
            body: document
                .body()
                .ok_or_else(|| JsValue::from_str("missing <body>"))?,

            cart_container: by_id("dev_cart_ajax"),

            catalog_anchor: by_id("catalog"),
            products_container: by_id("products-container"),
            load_more_btn: by_id("load-more-btn"),
            load_more_container: by_id("load-more-container"),
            show_more_btn: by_id("load-more-products"),
            remaining_count: by_id("remaining-count"),

            product_modal_content: by_id("dev_modal_product_ajax"),
        })
    }
}
