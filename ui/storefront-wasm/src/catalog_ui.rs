//! Catalog tree and product grid wiring.
//!
//! [`scan`] reads the server-rendered markup into a [`CatalogTree`] once at
//! startup. Every click mutates the tree and [`render`] re-applies its view
//! to both the content toggles and the navigation menu, so the two never
//! drift apart.

use crate::dom::{self, Elements};
use crate::events::{delegate, listen};
use crate::state;
use shop_client::StorefrontApi;
use shop_core::catalog::{product_skus, CatalogView};
use shop_core::{CatalogTree, NodeKey, NodeKind};
use std::collections::HashSet;
use tracing::{debug, error, info};
use web_sys::{Element, Event};

const BODY_LISTING_CLASS: &str = "section-products-open";
const LOADING_TEXT: &str = "Загрузка...";
const LOAD_MORE_TEXT: &str = "Показать еще";

/// Tree chrome hidden while a section's product list is shown.
const CHROME: &str = ".catalog-section, .catalog-section__header, .catalog-subsection, \
                      .catalog-subsection__title, .catalog-section-item, .catalog-section-item__title";

const TOGGLES: &str = ".category-toggle, .subcategory-toggle, .section-toggle, \
                       .category-menu-toggle, .subcategory-menu-toggle, .section-menu-toggle";

const MENU_TOGGLES: &str = ".category-menu-toggle, .subcategory-menu-toggle, .section-menu-toggle";

struct Level {
    kind: NodeKind,
    attr: &'static str,
    content: &'static str,
    menu: &'static str,
    /// Panel revealed when a node of this level expands.
    panel: Option<&'static str>,
}

const LEVELS: [Level; 3] = [
    Level {
        kind: NodeKind::Category,
        attr: "category-id",
        content: ".category-toggle",
        menu: ".category-menu-toggle",
        panel: Some(".category-subcategories"),
    },
    Level {
        kind: NodeKind::Subcategory,
        attr: "subcategory-id",
        content: ".subcategory-toggle",
        menu: ".subcategory-menu-toggle",
        panel: Some(".subcategory-sections"),
    },
    Level {
        kind: NodeKind::Section,
        attr: "section-id",
        content: ".section-toggle",
        menu: ".section-menu-toggle",
        panel: None,
    },
];

fn key(kind: NodeKind, id: u64) -> NodeKey {
    NodeKey { kind, id }
}

/// Node addressed by a content or menu toggle.
fn toggle_key(el: &Element) -> Option<NodeKey> {
    LEVELS.iter().find_map(|level| {
        let selector = format!("{}, {}", level.content, level.menu);
        if el.matches(&selector).unwrap_or(false) {
            dom::data_id(el, level.attr).map(|id| key(level.kind, id))
        } else {
            None
        }
    })
}

/// `category-12` → 12.
fn anchor_id(el: &Element) -> Option<u64> {
    el.id().strip_prefix("category-")?.parse().ok().filter(|id| *id != 0)
}

/// Nearest ancestor strictly above `el` matching `selector`.
fn ancestor(el: &Element, selector: &str) -> Option<Element> {
    dom::closest(&el.parent_element()?, selector)
}

// ── Scanning ──

fn content_parent(el: &Element, kind: NodeKind) -> Option<NodeKey> {
    match kind {
        NodeKind::Category => ancestor(el, ".category-subcategories[data-category-id]")
            .and_then(|panel| dom::data_id(&panel, "category-id"))
            .or_else(|| {
                let own = dom::closest(el, ".catalog-section[id^=\"category-\"]")?;
                anchor_id(&ancestor(&own, ".catalog-section[id^=\"category-\"]")?)
            })
            .map(NodeKey::category),
        NodeKind::Subcategory => dom::closest(el, ".category-subcategories[data-category-id]")
            .and_then(|panel| dom::data_id(&panel, "category-id"))
            .or_else(|| dom::data_id(el, "category-id"))
            .map(NodeKey::category),
        NodeKind::Section => dom::closest(el, ".subcategory-sections[data-subcategory-id]")
            .and_then(|panel| dom::data_id(&panel, "subcategory-id"))
            .or_else(|| dom::data_id(el, "subcategory-id"))
            .map(NodeKey::subcategory),
    }
}

/// Toggle of the enclosing dropdown item, one menu level up.
fn menu_parent(el: &Element) -> Option<NodeKey> {
    let item = dom::closest(el, "li")?;
    let outer = ancestor(&item, "li.has-dropdown")?;
    dom::query_all_within(&outer, MENU_TOGGLES)
        .into_iter()
        .find(|t| dom::closest(t, "li").is_some_and(|li| li == outer))
        .and_then(|t| toggle_key(&t))
}

/// Insert without ever demoting a placed node back to the root.
fn place(tree: &mut CatalogTree, node: NodeKey, parent: Option<NodeKey>) {
    match parent {
        Some(p) if p != node => tree.insert(node, Some(p)),
        _ if !tree.contains(node) => tree.insert(node, None),
        _ => {}
    }
}

/// Build the tree and product list from the current markup and install it.
pub fn scan(els: &Elements) {
    let mut tree = CatalogTree::new(&state::config());

    for section in dom::query_all(".catalog-section[id^=\"category-\"]") {
        if let Some(id) = anchor_id(&section) {
            place(&mut tree, NodeKey::category(id), content_parent(&section, NodeKind::Category));
        }
    }
    for level in &LEVELS {
        for el in dom::query_all(level.content) {
            if let Some(id) = dom::data_id(&el, level.attr) {
                place(&mut tree, key(level.kind, id), content_parent(&el, level.kind));
            }
        }
        for el in dom::query_all(level.menu) {
            if let Some(id) = dom::data_id(&el, level.attr) {
                place(&mut tree, key(level.kind, id), menu_parent(&el));
            }
        }
    }

    for link in dom::query_all(MENU_TOGGLES) {
        if !dom::has_class(&link, "active") {
            continue;
        }
        let Some(mut node) = toggle_key(&link) else {
            continue;
        };
        // An active section only opens its ancestors; listing starts on click.
        if node.kind == NodeKind::Section {
            match tree.parent(node) {
                Some(p) => node = p,
                None => continue,
            }
        }
        let mut seen = HashSet::new();
        let mut cursor = Some(node);
        while let Some(k) = cursor.filter(|k| seen.insert(*k)) {
            tree.mark_expanded(k);
            cursor = tree.parent(k);
        }
    }

    for item in dom::query_all("#products-container .product-item[data-product]") {
        if let Some(sku) = dom::data(&item, "product") {
            tree.add_product(
                &sku,
                dom::data_id(&item, "section-id"),
                dom::data_id(&item, "category-id"),
                dom::is_displayed(&item),
            );
        }
    }
    // Hidden per-section SKU lists are the primary membership source.
    for list in dom::query_all(".section-products[data-section-id]") {
        let Some(section_id) = dom::data_id(&list, "section-id") else {
            continue;
        };
        let skus: Vec<String> = dom::query_all_within(&list, "[data-product]")
            .iter()
            .filter_map(|card| dom::data(card, "product"))
            .collect();
        tree.assign_section(section_id, &skus);
    }
    tree.set_grid_visible(els.products_container.as_ref().is_some_and(dom::is_displayed));

    info!(products = tree.products().len(), "catalog scanned");
    state::catalog(|t| *t = tree);
}

// ── Rendering ──

/// Apply the current catalog view to the page.
pub fn render() {
    match Elements::bind() {
        Ok(els) => apply(&els, &state::catalog(|t| t.view())),
        Err(err) => error!("catalog render skipped: {:?}", err),
    }
}

fn apply(els: &Elements, view: &CatalogView) {
    dom::toggle_class(&els.body, BODY_LISTING_CLASS, view.listing_mode);

    for level in &LEVELS {
        for el in dom::query_all(&format!("{}, {}", level.content, level.menu)) {
            let Some(id) = dom::data_id(&el, level.attr) else {
                continue;
            };
            let open = view.expanded.contains(&key(level.kind, id));
            dom::toggle_class(&el, "is-open", open);
            let _ = el.set_attribute("aria-expanded", if open { "true" } else { "false" });
            if let Some(item) = dom::closest(&el, "li.has-dropdown") {
                dom::toggle_class(&item, "is-open", open);
                if let Some(sub) = dom::query_within(&item, ":scope > ul.menu-catalog__items") {
                    dom::set_visible(&sub, open);
                }
            }
        }
        let Some(panel) = level.panel else {
            continue;
        };
        for el in dom::query_all(&format!("{panel}[data-{}]", level.attr)) {
            if let Some(id) = dom::data_id(&el, level.attr) {
                let open = view.expanded.contains(&key(level.kind, id));
                dom::set_visible(&el, open && !view.listing_mode);
            }
        }
    }

    // Inline product rows under an expanded category.
    for el in dom::query_all(".category-products[data-category-id]") {
        if let Some(id) = dom::data_id(&el, "category-id") {
            let open = !view.listing_mode && view.expanded.contains(&NodeKey::category(id));
            dom::set_display(&el, if open { "flex" } else { "none" });
        }
    }

    if view.listing_mode {
        for el in dom::query_all(CHROME) {
            dom::set_display(&el, "none");
        }
    } else {
        for el in dom::query_all(CHROME) {
            match anchor_id(&el) {
                Some(id) => dom::set_display(
                    &el,
                    if view.visible_nodes.contains(&NodeKey::category(id)) { "" } else { "none" },
                ),
                None => dom::set_display(&el, ""),
            }
        }
    }

    apply_products(els, view);
    apply_load_more(els, view);
}

fn apply_products(els: &Elements, view: &CatalogView) {
    let Some(container) = &els.products_container else {
        return;
    };
    dom::set_visible(container, view.product_list_visible);
    let shown: HashSet<&str> = view.visible_products.iter().map(String::as_str).collect();
    for item in dom::query_all_within(container, ".product-item[data-product]") {
        if let Some(sku) = dom::data(&item, "product") {
            dom::set_visible(&item, shown.contains(sku.as_str()));
        }
    }

    if let Some(btn) = &els.show_more_btn {
        dom::set_visible(btn, view.show_more_visible);
    }
    if let Some(count) = &els.remaining_count {
        dom::set_text(count, &view.remaining_hidden.to_string());
    }
}

fn apply_load_more(els: &Elements, view: &CatalogView) {
    if let Some(container) = &els.load_more_container {
        dom::set_visible(container, view.load_more.is_some());
    }
    let mut buttons = dom::query_all(".section-load-more-btn");
    buttons.extend(els.load_more_btn.iter().cloned());
    for btn in buttons {
        let Some(cursor) = view.load_more else {
            dom::set_visible(&btn, false);
            continue;
        };
        dom::set_visible(&btn, true);
        if let Some(section) = view.active_section {
            let _ = btn.set_attribute("data-section-id", &section.to_string());
        }
        let _ = btn.set_attribute("data-offset", &cursor.offset.to_string());
        let _ = btn.set_attribute("data-limit", &cursor.limit.to_string());
        dom::set_disabled(&btn, view.load_more_busy);
        dom::set_text(&btn, if view.load_more_busy { LOADING_TEXT } else { LOAD_MORE_TEXT });
    }
}

// ── Actions ──

/// Expand a category with its ancestors and descendants, then scroll to it.
pub fn open_category(id: u64) {
    let opened = state::catalog(|t| t.open_category(id));
    debug!(category_id = id, opened = opened.len(), "open_category");
    render();
    if let Some(anchor) = dom::by_id(&format!("category-{id}")) {
        dom::scroll_to_element(&anchor, state::config().scroll_offset_px);
    }
}

pub fn filter_products_by_category(id: u64) {
    let shown = state::catalog(|t| t.filter_by_category(id));
    debug!(category_id = id, shown, "filtered grid");
    render();
}

fn open_from_hash() {
    let hash = dom::window()
        .and_then(|w| w.location().hash())
        .unwrap_or_default();
    if let Some(id) = hash
        .strip_prefix("#category-")
        .and_then(|id| id.parse::<u64>().ok())
        .filter(|id| *id != 0)
    {
        open_category(id);
    }
}

fn on_toggle(els: &Elements, el: &Element) {
    let Some(node) = toggle_key(el) else {
        return;
    };
    let is_menu = el.matches(MENU_TOGGLES).unwrap_or(false);
    let transition = state::catalog(|t| t.toggle(node));
    debug!(?node, ?transition, "toggle");
    if transition.is_none() {
        return;
    }

    if node.kind == NodeKind::Section && is_menu {
        let expanded = state::catalog(|t| t.is_expanded(node));
        for link in dom::query_all(".section-menu-toggle") {
            dom::remove_class(&link, "active");
        }
        if expanded {
            dom::add_class(el, "active");
        }
    }
    render();
    if is_menu {
        if let Some(anchor) = &els.catalog_anchor {
            dom::scroll_to_element(anchor, state::config().scroll_offset_px);
        }
    }
}

/// Fetch the next page of the open section and append unseen products.
pub async fn on_load_more(els: &Elements, _btn: Element) {
    let Some(api) = state::api() else {
        return;
    };
    let Some(query) = state::catalog(|t| t.next_page()) else {
        return;
    };
    render();

    match api.section_products(query).await {
        Ok(resp) => {
            let skus = product_skus(&resp.html);
            let added = state::catalog(|t| t.apply_page(query.section_id, &skus, resp.has_more));
            if let Err(err) = append_cards(els, &resp.html, &added, query.section_id) {
                error!("could not append products: {:?}", err);
            }
            debug!(section_id = query.section_id, added = added.len(), has_more = resp.has_more, "page loaded");
        }
        Err(err) => {
            state::catalog(|t| t.page_failed(query.section_id));
            error!(section_id = query.section_id, offset = query.offset, "load more failed: {}", err);
        }
    }
    render();
}

/// Wrap each new card in a grid cell tagged with its SKU and section. The
/// server sends cards inside their own grid column; only the column's
/// content moves into the cell.
pub fn append_cards(
    els: &Elements,
    html: &str,
    added: &[String],
    section_id: u64,
) -> Result<(), wasm_bindgen::JsValue> {
    let Some(container) = &els.products_container else {
        return Ok(());
    };
    if added.is_empty() {
        return Ok(());
    }
    let scratch = dom::create_element("div")?;
    dom::set_inner_html(&scratch, html);

    let children = scratch.children();
    for i in 0..children.length() {
        let Some(card) = children.item(i) else {
            continue;
        };
        let bare = dom::data(&card, "product");
        let sku = bare
            .clone()
            .or_else(|| dom::query_within(&card, "[data-product]").and_then(|el| dom::data(&el, "product")));
        let Some(sku) = sku.filter(|s| added.contains(s)) else {
            continue;
        };
        let cell = dom::create_element("div")?;
        cell.set_class_name("column column-block product-item");
        cell.set_attribute("data-product", &sku)?;
        cell.set_attribute("data-section-id", &section_id.to_string())?;
        // A card sent without a column wrapper moves whole.
        let markup = if bare.is_some() { card.outer_html() } else { card.inner_html() };
        cell.set_inner_html(&markup);
        container.append_child(&cell)?;
    }
    Ok(())
}

// ── Binding ──

pub fn bind(els: &Elements) {
    let toggle_els = els.clone();
    delegate("click", TOGGLES, move |el, ev| {
        ev.prevent_default();
        on_toggle(&toggle_els, &el);
    });

    delegate("click", "[data-filter-category]", |el, ev| {
        ev.prevent_default();
        let id = dom::data(&el, "filter-category")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        filter_products_by_category(id);
    });

    if let Some(btn) = &els.show_more_btn {
        listen(btn, "click", |ev: Event| {
            ev.prevent_default();
            let remaining = state::catalog(|t| t.show_more());
            debug!(remaining, "show more");
            render();
        });
    }

    if let Ok(window) = dom::window() {
        listen(&window, "hashchange", |_: Event| open_from_hash());
    }
    open_from_hash();
}
