//! Global application state.
//!
//! Uses `RefCell`-wrapped `thread_local!` storage (WASM is single-threaded).
//! Borrows never span an `.await`: handlers copy what they need out first.

use crate::api::FetchApi;
use shop_core::{Accordion, CartService, CatalogTree, ModalController, StorefrontConfig};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
pub struct AppState {
    pub config: StorefrontConfig,
    pub catalog: CatalogTree,
    pub faq: Accordion,
    pub api: Option<Rc<FetchApi>>,
    pub cart: Option<CartService<FetchApi>>,
    pub modals: Option<Rc<ModalController>>,
}

// ── Thread-local singleton ──

thread_local! {
    static STATE: RefCell<AppState> = RefCell::new(AppState::default());
}

/// Run a closure with shared read access to the state.
pub fn with<F, R>(f: F) -> R
where
    F: FnOnce(&AppState) -> R,
{
    STATE.with(|s| f(&s.borrow()))
}

/// Run a closure with mutable access to the state.
pub fn with_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut AppState) -> R,
{
    STATE.with(|s| f(&mut s.borrow_mut()))
}

// ── Convenience accessors ──

pub fn config() -> StorefrontConfig {
    with(|s| s.config.clone())
}

pub fn api() -> Option<Rc<FetchApi>> {
    with(|s| s.api.clone())
}

pub fn cart() -> Option<CartService<FetchApi>> {
    with(|s| s.cart.clone())
}

pub fn modals() -> Option<Rc<ModalController>> {
    with(|s| s.modals.clone())
}

pub fn catalog<F, R>(f: F) -> R
where
    F: FnOnce(&mut CatalogTree) -> R,
{
    with_mut(|s| f(&mut s.catalog))
}
