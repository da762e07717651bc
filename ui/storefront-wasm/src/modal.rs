//! Modal backends and triggers.
//!
//! `FoundationModal` drives Foundation's Reveal plugin through reflection
//! (`Foundation.getPlugin`, `new Foundation.Reveal`). `ManualModal` toggles
//! classes and styles directly and owns the synthetic `.reveal-overlay`.

use crate::catalog_ui;
use crate::dom::{self, Elements};
use crate::events::{delegate, listen};
use crate::state;
use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Function, Reflect};
use shop_core::{ModalBackend, ModalError};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, KeyboardEvent};

fn framework_err(err: JsValue) -> ModalError {
    ModalError::Framework(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn global(name: &str) -> Option<JsValue> {
    let value = Reflect::get(&js_sys::global(), &JsValue::from_str(name)).ok()?;
    (!value.is_undefined() && !value.is_null()).then_some(value)
}

fn modal_element(id: &str) -> Result<Element, ModalError> {
    dom::by_id(id).ok_or_else(|| ModalError::NotFound(id.to_owned()))
}

fn method(target: &JsValue, name: &str) -> Result<Function, ModalError> {
    Reflect::get(target, &JsValue::from_str(name))
        .map_err(framework_err)?
        .dyn_into::<Function>()
        .map_err(|_| ModalError::Framework(format!("{name} is not a function")))
}

// ── Framework access ──

/// Foundation plus the jQuery it wraps elements with.
pub struct Foundation {
    foundation: JsValue,
    jquery: Function,
}

impl Foundation {
    /// Present only when both Foundation and jQuery are loaded.
    pub fn detect() -> Option<Self> {
        let foundation = global("Foundation")?;
        let jquery = global("jQuery")?.dyn_into::<Function>().ok()?;
        Some(Self { foundation, jquery })
    }

    fn wrap(&self, el: &Element) -> Result<JsValue, ModalError> {
        self.jquery.call1(&JsValue::NULL, el).map_err(framework_err)
    }

    /// Plugin instance (`Reveal`, `OffCanvas`, ...) already bound to `el`.
    pub fn plugin(&self, el: &Element, name: &str) -> Result<Option<JsValue>, ModalError> {
        let existing = method(&self.foundation, "getPlugin")?
            .call2(&self.foundation, &self.wrap(el)?, &JsValue::from_str(name))
            .map_err(framework_err)?;
        Ok((!existing.is_undefined() && !existing.is_null()).then_some(existing))
    }

    /// Existing instance, or a new one built with `new Foundation[name]`.
    pub fn plugin_or_new(&self, el: &Element, name: &str) -> Result<JsValue, ModalError> {
        if let Some(existing) = self.plugin(el, name)? {
            return Ok(existing);
        }
        let ctor = method(&self.foundation, name)?;
        Reflect::construct(&ctor, &Array::of1(&self.wrap(el)?)).map_err(framework_err)
    }

    /// Call a no-argument method on a plugin instance.
    pub fn call(plugin: &JsValue, action: &str) -> Result<(), ModalError> {
        method(plugin, action)?
            .call0(plugin)
            .map(|_| ())
            .map_err(framework_err)
    }
}

// ── Framework backend ──

pub struct FoundationModal {
    foundation: Foundation,
}

impl FoundationModal {
    pub fn detect() -> Option<Self> {
        Foundation::detect().map(|foundation| Self { foundation })
    }

    fn invoke(&self, id: &str, action: &str) -> Result<(), ModalError> {
        let el = modal_element(id)?;
        let plugin = self.foundation.plugin_or_new(&el, "Reveal")?;
        Foundation::call(&plugin, action)
    }
}

impl ModalBackend for FoundationModal {
    fn name(&self) -> &'static str {
        "foundation"
    }

    fn open(&self, id: &str) -> Result<(), ModalError> {
        self.invoke(id, "open")
    }

    fn close(&self, id: &str) -> Result<(), ModalError> {
        self.invoke(id, "close")
    }
}

// ── Manual backend ──

pub struct ManualModal {
    els: Elements,
}

impl ManualModal {
    pub fn new(els: &Elements) -> Self {
        Self { els: els.clone() }
    }

    fn overlay(&self) -> Option<Element> {
        if let Some(existing) = dom::query(".reveal-overlay") {
            return Some(existing);
        }
        let overlay = dom::create_element("div").ok()?;
        dom::add_class(&overlay, "reveal-overlay");
        self.els.body.append_child(&overlay).ok()?;
        Some(overlay)
    }

    fn hide_overlay(&self) {
        for overlay in dom::query_all(".reveal-overlay") {
            dom::remove_class(&overlay, "is-open");
            dom::set_visible(&overlay, false);
        }
    }

    fn unlock_scroll(&self) {
        let body: &Element = &self.els.body;
        for el in [&self.els.html, body] {
            dom::remove_class(el, "is-reveal-open");
            if dom::style(el, "overflow") == "hidden" {
                dom::set_style(el, "overflow", "");
            }
        }
    }
}

impl ModalBackend for ManualModal {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn open(&self, id: &str) -> Result<(), ModalError> {
        let el = modal_element(id)?;
        dom::add_class(&el, "is-open");
        dom::set_display(&el, "block");
        dom::add_class(&self.els.body, "is-reveal-open");
        dom::set_style(&self.els.body, "overflow", "hidden");
        if let Some(overlay) = self.overlay() {
            dom::add_class(&overlay, "is-open");
            dom::set_display(&overlay, "block");
        }
        Ok(())
    }

    fn close(&self, id: &str) -> Result<(), ModalError> {
        let el = modal_element(id)?;
        dom::remove_class(&el, "is-open");
        dom::set_visible(&el, false);
        if dom::query(".reveal.is-open").is_none() {
            self.hide_overlay();
            self.unlock_scroll();
        }
        Ok(())
    }

    fn reset_page(&self) {
        dom::remove_class(&self.els.body, "section-products-open");
        self.hide_overlay();
        for stuck in dom::query_all(".reveal.is-open") {
            dom::remove_class(&stuck, "is-open");
            dom::set_visible(&stuck, false);
        }
        self.unlock_scroll();
    }
}

// ── Page state ──

/// After the configured delay, force the page back to a no-modal state and
/// re-apply the catalog view, which may own `section-products-open`.
pub fn restore_page_state() {
    let delay = state::config().restore_delay_ms;
    wasm_bindgen_futures::spawn_local(async move {
        TimeoutFuture::new(delay).await;
        if let Some(modals) = state::modals() {
            modals.restore_page_state();
            if let Some(y) = modals.take_scroll() {
                dom::scroll_to(y);
            }
        }
        catalog_ui::render();
    });
}

/// Same, but only if no modal is open once the delay has passed.
fn restore_if_idle() {
    let delay = state::config().restore_delay_ms;
    wasm_bindgen_futures::spawn_local(async move {
        TimeoutFuture::new(delay).await;
        let busy = state::modals().is_some_and(|m| m.any_open()) || dom::query(".reveal.is-open").is_some();
        if !busy {
            if let Some(modals) = state::modals() {
                modals.restore_page_state();
            }
            catalog_ui::render();
        }
    });
}

fn close_everything() {
    let Some(modals) = state::modals() else {
        return;
    };
    let closed = modals.close_all();
    // Anything opened by page scripts rather than through us.
    for el in dom::query_all(".reveal.is-open") {
        if !el.id().is_empty() && !closed.contains(&el.id()) {
            if let Err(err) = modals.close(&el.id()) {
                warn!(modal = %el.id(), "close failed: {}", err);
            }
        }
    }
    restore_page_state();
}

// ── Triggers ──

pub fn bind_triggers() {
    delegate("click", "[data-open]", |trigger, ev| {
        ev.prevent_default();
        let Some(id) = trigger.get_attribute("data-open").filter(|id| !id.is_empty()) else {
            return;
        };
        let Some(modals) = state::modals() else {
            return;
        };
        modals.remember_scroll(dom::scroll_y());
        match modals.open(&id) {
            Ok(()) => debug!(modal = %id, backend = modals.backend_name(), "opened"),
            Err(err) => warn!(modal = %id, "open failed: {}", err),
        }
    });

    delegate("click", "[data-close]", |trigger, ev| {
        ev.prevent_default();
        let Some(reveal) = dom::closest(&trigger, ".reveal") else {
            close_everything();
            return;
        };
        if let Some(modals) = state::modals() {
            if let Err(err) = modals.close(&reveal.id()) {
                warn!(modal = %reveal.id(), "close failed: {}", err);
            }
        }
        restore_page_state();
    });

    delegate("click", ".reveal-overlay", |overlay, ev| {
        let on_overlay = dom::event_element(&ev).is_some_and(|t| t == overlay);
        if on_overlay {
            close_everything();
        }
    });

    let Ok(document) = dom::document() else {
        return;
    };
    listen(&document, "keydown", |ev: Event| {
        let escape = ev
            .dyn_ref::<KeyboardEvent>()
            .is_some_and(|k| k.key() == "Escape");
        if escape {
            close_everything();
        }
    });

    listen(&document, "click", |ev: Event| {
        let trigger = dom::event_element(&ev).and_then(|t| dom::closest(&t, "[data-open]"));
        if trigger.is_none() {
            restore_if_idle();
        }
    });
}
