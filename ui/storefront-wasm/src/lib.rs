//! Storefront WASM frontend.
//!
//! Progressive enhancement over server-rendered pages: cart, catalog tree,
//! forms and modals. Business rules live in `shop-core`; this crate binds
//! them to the DOM and the browser's fetch.

pub mod api;
pub mod cart_ui;
pub mod catalog_ui;
pub mod dom;
pub mod events;
pub mod forms_ui;
pub mod modal;
pub mod page;
pub mod product_detail;
pub mod state;

use shop_core::price::QuantityBounds;
use shop_core::{CartService, CartStore, CatalogTree, ModalBackend, ModalController, StorefrontConfig};
use std::rc::Rc;
use tracing::info;
use wasm_bindgen::prelude::*;

/// WASM entry point, run when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    // A second init (hot reload) keeps the first logger.
    let _ = console_log::init_with_level(log::Level::Info);

    init().await
}

/// Page config: defaults, overridden by `<body data-storefront-config>` and
/// `<body data-api-base>`.
fn read_config(els: &dom::Elements) -> StorefrontConfig {
    let mut config = dom::data(&els.body, "storefront-config")
        .map(|raw| StorefrontConfig::from_json(&raw))
        .unwrap_or_default();
    if let Some(base) = dom::data(&els.body, "api-base") {
        config.api_base = base.trim_end_matches('/').to_owned();
    }
    config
}

async fn init() -> Result<(), JsValue> {
    let els = dom::Elements::bind()?;
    let config = read_config(&els);

    let api = Rc::new(api::FetchApi::new(&config));
    let store = CartStore::new();
    let render_els = els.clone();
    store.subscribe(move |snapshot| cart_ui::render_cart(&render_els, snapshot));
    let bounds = QuantityBounds {
        min: config.min_quantity,
        max: config.max_quantity,
    };
    let cart = CartService::new(api.clone(), store, Rc::new(cart_ui::AlertNotifier), bounds);

    let framework = modal::FoundationModal::detect().map(|m| Rc::new(m) as Rc<dyn ModalBackend>);
    let modals = ModalController::new(Rc::new(modal::ManualModal::new(&els)), framework);
    info!(modals = modals.backend_name(), api_base = %config.api_base, "storefront starting");

    state::with_mut(|s| {
        s.catalog = CatalogTree::new(&config);
        s.config = config;
        s.api = Some(api);
        s.cart = Some(cart.clone());
        s.modals = Some(Rc::new(modals));
    });

    catalog_ui::scan(&els);
    catalog_ui::render();
    events::bind_events(&els);

    cart.fetch_cart().await;
    Ok(())
}

/// Expand a catalog category (with ancestors and descendants) from page
/// scripts.
#[wasm_bindgen(js_name = openCategory)]
pub fn open_category(category_id: u32) {
    catalog_ui::open_category(u64::from(category_id));
}

/// Show the products of one category in the grid; `0` shows all.
#[wasm_bindgen(js_name = filterProductsByCategory)]
pub fn filter_products_by_category(category_id: u32) {
    catalog_ui::filter_products_by_category(u64::from(category_id));
}
