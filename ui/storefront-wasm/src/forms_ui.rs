//! Lead forms and the callback / feedback / consultation modals.

use crate::dom;
use crate::events::{delegate, listen};
use crate::modal;
use crate::state;
use gloo_timers::future::TimeoutFuture;
use shop_core::forms::{submit_contact, submit_lead, MSG_CONTACT_THANKS};
use shop_core::{ContactForm, ContactKind, FormOutcome, LeadForm};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, FormData, HtmlFormElement, HtmlInputElement};

/// Inline status line (`[data-role="form-message"]`) inside a form.
pub fn render_form_message(form: &Element, text: &str, success: bool) {
    let Some(el) = dom::query_within(form, "[data-role=\"form-message\"]") else {
        return;
    };
    dom::set_text(&el, text);
    dom::remove_class(&el, "is-success");
    dom::remove_class(&el, "is-error");
    if text.is_empty() {
        dom::set_display(&el, "none");
    } else {
        dom::add_class(&el, if success { "is-success" } else { "is-error" });
        dom::set_display(&el, "block");
    }
}

fn reset(form: &Element) {
    if let Some(f) = form.dyn_ref::<HtmlFormElement>() {
        f.reset();
    }
}

// ── Lead forms ──

pub fn bind_lead_forms() {
    delegate("submit", ".js-lead-form", |form, ev| {
        let Some(lead_type) = dom::data(&form, "lead-type") else {
            return;
        };
        ev.prevent_default();
        if dom::has_class(&form, "is-loading") {
            return;
        }
        wasm_bindgen_futures::spawn_local(async move {
            on_lead_submit(form, lead_type).await;
        });
    });
}

async fn on_lead_submit(form: Element, lead_type: String) {
    let Some(api) = state::api() else {
        return;
    };
    let lead = LeadForm {
        lead_type,
        name: dom::field(&form, "NAME"),
        email: dom::field(&form, "EMAIL"),
        phone: dom::field(&form, "PHONE"),
        message: dom::field(&form, "MESSAGE"),
    };
    let success_text = dom::data(&form, "success-text");

    dom::add_class(&form, "is-loading");
    render_form_message(&form, "", true);
    let outcome = submit_lead(api.as_ref(), &lead, success_text.as_deref()).await;
    render_form_message(&form, &outcome.message(), outcome.is_success());
    if outcome.is_success() {
        reset(&form);
    }
    dom::remove_class(&form, "is-loading");
}

// ── Contact modals ──

/// Every field of the form in document order, as the browser would post it.
fn serialize(form: &HtmlFormElement) -> Vec<(String, String)> {
    let Ok(data) = FormData::new_with_form(form) else {
        return Vec::new();
    };
    let Ok(Some(entries)) = js_sys::try_iter(&data) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let pair = entry.dyn_into::<js_sys::Array>().ok()?;
            Some((pair.get(0).as_string()?, pair.get(1).as_string()?))
        })
        .collect()
}

fn read_contact(kind: ContactKind, form: &HtmlFormElement) -> ContactForm {
    let el: &Element = form;
    let value = |selector: &str| {
        dom::query_within(el, selector)
            .map(|f| dom::value_of(&f))
            .unwrap_or_default()
    };
    let consent = dom::query_within(el, "input[type=\"checkbox\"][required]")
        .and_then(|c| c.dyn_into::<HtmlInputElement>().ok())
        .map(|c| c.checked());
    ContactForm {
        kind,
        action: form.action(),
        name: value("input[type=\"text\"][name=\"name\"]"),
        phone: value("input[type=\"tel\"][name=\"phone\"]"),
        message: value("textarea[name=\"message\"]"),
        consent,
        csrf_token: value("[name=\"csrfmiddlewaretoken\"]"),
        fields: serialize(form),
    }
}

pub fn bind_contact_forms() {
    for kind in ContactKind::ALL {
        let Some(form) = dom::by_id_typed::<HtmlFormElement>(kind.form_id()) else {
            debug!(form = kind.form_id(), "not on this page");
            continue;
        };
        let target = form.clone();
        listen(&target, "submit", move |ev: Event| {
            ev.prevent_default();
            let form = form.clone();
            wasm_bindgen_futures::spawn_local(async move {
                on_contact_submit(kind, form).await;
            });
        });
    }
}

async fn on_contact_submit(kind: ContactKind, form: HtmlFormElement) {
    let Some(api) = state::api() else {
        return;
    };
    let contact = read_contact(kind, &form);
    if let Err(err) = contact.validate() {
        dom::alert(&err.to_string());
        if let Some(field) = err.field().and_then(|f| dom::query_within(&form, &format!("[name=\"{f}\"]"))) {
            dom::focus(&field);
        }
        return;
    }

    let button = dom::query_within(&form, "button[type=\"submit\"]");
    let original = button.as_ref().map(|b| b.inner_html()).unwrap_or_default();
    if let Some(b) = &button {
        dom::set_disabled(b, true);
        dom::set_inner_html(b, "<i class=\"icon-loading\"></i> Отправка...");
    }

    match submit_contact(api.as_ref(), &contact).await {
        FormOutcome::Sent(_) => {
            dom::set_inner_html(
                &form,
                &format!(
                    "<div class=\"alert alert-success\" style=\"padding: 20px; text-align: center;\"><i class=\"icon-check\"></i><br>{MSG_CONTACT_THANKS}</div>"
                ),
            );
            TimeoutFuture::new(state::config().modal_auto_close_ms).await;
            if let Some(modals) = state::modals() {
                if let Err(err) = modals.close(kind.modal_id()) {
                    warn!(modal = kind.modal_id(), "auto-close failed: {}", err);
                }
            }
            modal::restore_page_state();
        }
        outcome => {
            dom::alert(&outcome.message());
            if let Some(b) = &button {
                dom::set_disabled(b, false);
                dom::set_inner_html(b, &original);
            }
        }
    }
}
