//! Catalog disclosure state.
//!
//! The catalog is an explicit tree (category → subcategory → section) where
//! each node carries an `expanded` flag, plus the flat product grid shown in
//! the main area. Clicks mutate the tree; [`CatalogTree::view`] projects the
//! state to what should be visible and the browser crate applies it.
//!
//! Opening a section switches to listing mode: the tree chrome is hidden and
//! the grid shows one page of that section's products, with a cursor for
//! loading further pages from the server.

use crate::config::StorefrontConfig;
use shop_api_types::SectionProductsQuery;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Category,
    Subcategory,
    Section,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub kind: NodeKind,
    pub id: u64,
}

impl NodeKey {
    pub fn category(id: u64) -> Self {
        Self { kind: NodeKind::Category, id }
    }

    pub fn subcategory(id: u64) -> Self {
        Self { kind: NodeKind::Subcategory, id }
    }

    pub fn section(id: u64) -> Self {
        Self { kind: NodeKind::Section, id }
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductEntry {
    pub sku: String,
    pub section_id: Option<u64>,
    pub category_id: Option<u64>,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadMoreCursor {
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionListing {
    pub section_id: u64,
    pub cursor: LoadMoreCursor,
    pub has_more: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Expanded,
    Collapsed,
}

/// Everything the DOM needs to know, derived from tree state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    pub listing_mode: bool,
    pub active_section: Option<u64>,
    /// Whether the product grid container should be shown at all.
    pub product_list_visible: bool,
    pub visible_nodes: BTreeSet<NodeKey>,
    pub expanded: BTreeSet<NodeKey>,
    pub visible_products: Vec<String>,
    /// Present while the section load-more control should be shown.
    pub load_more: Option<LoadMoreCursor>,
    pub load_more_busy: bool,
    pub show_more_visible: bool,
    pub remaining_hidden: usize,
}

#[derive(Debug, Clone)]
pub struct CatalogTree {
    nodes: BTreeMap<NodeKey, Node>,
    roots: Vec<NodeKey>,
    products: Vec<ProductEntry>,
    listing: Option<SectionListing>,
    /// Ordered SKU lists from the hidden per-section markup.
    section_members: BTreeMap<u64, Vec<String>>,
    grid_visible: bool,
    show_more_enabled: bool,
    page_size: u32,
    grid_batch: usize,
    max_depth: usize,
}

impl Default for CatalogTree {
    fn default() -> Self {
        Self::new(&StorefrontConfig::default())
    }
}

impl CatalogTree {
    pub fn new(config: &StorefrontConfig) -> Self {
        Self {
            nodes: BTreeMap::new(),
            roots: Vec::new(),
            products: Vec::new(),
            listing: None,
            section_members: BTreeMap::new(),
            grid_visible: true,
            show_more_enabled: true,
            page_size: config.section_page_size.max(1),
            grid_batch: config.grid_batch_size.max(1),
            max_depth: config.max_open_depth,
        }
    }

    // ── Building ──

    /// Add a node, or move an existing one under a new parent. Parents are
    /// created on demand. No cycle check is made here; traversals guard
    /// against cycles themselves.
    pub fn insert(&mut self, key: NodeKey, parent: Option<NodeKey>) {
        if let Some(p) = parent {
            self.nodes.entry(p).or_default();
            if !self.roots.contains(&p) && self.nodes[&p].parent.is_none() && p != key {
                self.roots.push(p);
            }
        }
        let old_parent = self.nodes.entry(key).or_default().parent;
        if old_parent == parent && (parent.is_some() || self.roots.contains(&key)) {
            return;
        }
        match old_parent {
            Some(old) => {
                if let Some(n) = self.nodes.get_mut(&old) {
                    n.children.retain(|c| *c != key);
                }
            }
            None => self.roots.retain(|r| *r != key),
        }
        if let Some(n) = self.nodes.get_mut(&key) {
            n.parent = parent;
        }
        match parent {
            Some(p) => {
                if let Some(n) = self.nodes.get_mut(&p) {
                    if !n.children.contains(&key) {
                        n.children.push(key);
                    }
                }
            }
            None => self.roots.push(key),
        }
    }

    pub fn add_product(&mut self, sku: &str, section_id: Option<u64>, category_id: Option<u64>, visible: bool) {
        let listed = self
            .section_members
            .iter()
            .find(|(_, skus)| skus.iter().any(|s| s == sku))
            .map(|(id, _)| *id);
        self.products.push(ProductEntry {
            sku: sku.to_owned(),
            section_id: listed.or(section_id),
            category_id,
            visible,
        });
    }

    /// Declare a section's products by SKU, in display order. This takes
    /// precedence over `section_id` tags on grid items; SKUs not in the grid
    /// still count towards the section's size.
    pub fn assign_section(&mut self, section_id: u64, skus: &[String]) {
        let members = self.section_members.entry(section_id).or_default();
        for sku in skus {
            if sku.is_empty() || members.contains(sku) {
                continue;
            }
            members.push(sku.clone());
        }
        for p in &mut self.products {
            if skus.contains(&p.sku) {
                p.section_id = Some(section_id);
            }
        }
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(&key).and_then(|n| n.parent)
    }

    pub fn is_expanded(&self, key: NodeKey) -> bool {
        self.nodes.get(&key).is_some_and(|n| n.expanded)
    }

    pub fn listing(&self) -> Option<&SectionListing> {
        self.listing.as_ref()
    }

    pub fn products(&self) -> &[ProductEntry] {
        &self.products
    }

    /// Initial visibility of the product grid outside listing mode.
    pub fn set_grid_visible(&mut self, visible: bool) {
        self.grid_visible = visible;
    }

    /// Mark a node expanded without touching siblings (initial `active`
    /// menu links).
    pub fn mark_expanded(&mut self, key: NodeKey) {
        if let Some(n) = self.nodes.get_mut(&key) {
            n.expanded = true;
        }
    }

    // ── Toggling ──

    fn siblings(&self, key: NodeKey) -> Vec<NodeKey> {
        let pool: Vec<NodeKey> = match key.kind {
            // One product list at a time: sections are exclusive page-wide.
            NodeKind::Section => self.nodes.keys().copied().collect(),
            _ => match self.parent(key) {
                Some(p) => self.nodes.get(&p).map(|n| n.children.clone()).unwrap_or_default(),
                None => self.roots.clone(),
            },
        };
        pool.into_iter()
            .filter(|k| *k != key && k.kind == key.kind)
            .collect()
    }

    fn set_expanded(&mut self, key: NodeKey, expanded: bool) {
        if let Some(n) = self.nodes.get_mut(&key) {
            n.expanded = expanded;
        }
    }

    fn expand_exclusive(&mut self, key: NodeKey) {
        for sibling in self.siblings(key) {
            self.set_expanded(sibling, false);
        }
        self.set_expanded(key, true);
    }

    /// Click on a toggle: collapse if open, otherwise close siblings at the
    /// same level and open this one. `None` for unknown nodes.
    pub fn toggle(&mut self, key: NodeKey) -> Option<Transition> {
        let expanded = self.nodes.get(&key)?.expanded;
        if expanded {
            self.set_expanded(key, false);
            if key.kind == NodeKind::Section {
                self.leave_listing();
            }
            debug!(?key, "collapsed");
            return Some(Transition::Collapsed);
        }

        self.expand_exclusive(key);
        match key.kind {
            NodeKind::Section => self.enter_listing(key.id),
            _ => self.leave_listing(),
        }
        debug!(?key, "expanded");
        Some(Transition::Expanded)
    }

    fn enter_listing(&mut self, section_id: u64) {
        let page = self.page_size as usize;
        let members = self.section_members.get(&section_id);
        // First page in list order when the list names grid products.
        let first_page: Option<HashSet<String>> = members
            .map(|m| {
                m.iter()
                    .filter(|sku| self.products.iter().any(|p| &p.sku == *sku))
                    .take(page)
                    .cloned()
                    .collect::<HashSet<_>>()
            })
            .filter(|first| !first.is_empty());

        let mut shown = 0;
        let mut tagged = 0;
        for p in &mut self.products {
            let in_section = p.section_id == Some(section_id);
            tagged += usize::from(in_section);
            p.visible = match &first_page {
                Some(first) => first.contains(&p.sku),
                None => in_section && shown < page,
            };
            shown += usize::from(p.visible);
        }
        let total = tagged.max(members.map_or(0, Vec::len));
        self.listing = Some(SectionListing {
            section_id,
            cursor: LoadMoreCursor {
                offset: self.page_size,
                limit: self.page_size,
            },
            has_more: total > page,
            loading: false,
        });
    }

    fn leave_listing(&mut self) {
        if let Some(listing) = self.listing.take() {
            self.set_expanded(NodeKey::section(listing.section_id), false);
            self.grid_visible = false;
        }
    }

    /// Expand a category together with its ancestors and every descendant
    /// category/subcategory. Recursion stops at the configured depth and a
    /// node is never visited twice, so cyclic parent links terminate.
    pub fn open_category(&mut self, category_id: u64) -> Vec<NodeKey> {
        let key = NodeKey::category(category_id);
        let mut opened = Vec::new();
        if !self.contains(key) {
            warn!(category_id, "open_category: unknown category");
            return opened;
        }
        self.leave_listing();

        let mut climbed = HashSet::from([key]);
        let mut cursor = self.parent(key);
        while let Some(ancestor) = cursor {
            if !climbed.insert(ancestor) || climbed.len() > self.max_depth + 1 {
                break;
            }
            if ancestor.kind != NodeKind::Section {
                self.expand_exclusive(ancestor);
                opened.push(ancestor);
            }
            cursor = self.parent(ancestor);
        }

        self.expand_exclusive(key);
        opened.push(key);

        let mut visited = climbed;
        let children = self.nodes.get(&key).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            self.open_descendants(child, 1, &mut visited, &mut opened);
        }
        opened
    }

    fn open_descendants(
        &mut self,
        key: NodeKey,
        depth: usize,
        visited: &mut HashSet<NodeKey>,
        opened: &mut Vec<NodeKey>,
    ) {
        if depth > self.max_depth || key.kind == NodeKind::Section || !visited.insert(key) {
            return;
        }
        self.set_expanded(key, true);
        opened.push(key);
        let children = self.nodes.get(&key).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            self.open_descendants(child, depth + 1, visited, opened);
        }
    }

    // ── Projection ──

    /// Nodes whose chrome should be visible: roots, and children of visible
    /// expanded nodes. Empty in listing mode.
    pub fn visible_nodes(&self) -> BTreeSet<NodeKey> {
        let mut visible = BTreeSet::new();
        if self.listing.is_some() {
            return visible;
        }
        let mut stack: Vec<NodeKey> = self.roots.clone();
        while let Some(key) = stack.pop() {
            if !visible.insert(key) {
                continue;
            }
            if let Some(node) = self.nodes.get(&key).filter(|n| n.expanded) {
                stack.extend(node.children.iter().copied());
            }
        }
        visible
    }

    pub fn view(&self) -> CatalogView {
        let remaining_hidden = self.remaining_hidden();
        CatalogView {
            listing_mode: self.listing.is_some(),
            active_section: self.listing.as_ref().map(|l| l.section_id),
            product_list_visible: self.listing.is_some() || self.grid_visible,
            visible_nodes: self.visible_nodes(),
            expanded: self
                .nodes
                .iter()
                .filter(|(_, n)| n.expanded)
                .map(|(k, _)| *k)
                .collect(),
            visible_products: self
                .products
                .iter()
                .filter(|p| p.visible)
                .map(|p| p.sku.clone())
                .collect(),
            load_more: self
                .listing
                .as_ref()
                .filter(|l| l.has_more)
                .map(|l| l.cursor),
            load_more_busy: self.listing.as_ref().is_some_and(|l| l.loading),
            show_more_visible: self.listing.is_none() && self.show_more_enabled && remaining_hidden > 0,
            remaining_hidden,
        }
    }

    // ── Section pagination ──

    /// Claim the next page request. `None` while a request is in flight or
    /// when there is nothing more to load.
    pub fn next_page(&mut self) -> Option<SectionProductsQuery> {
        let listing = self.listing.as_mut().filter(|l| l.has_more && !l.loading)?;
        listing.loading = true;
        Some(SectionProductsQuery {
            section_id: listing.section_id,
            offset: listing.cursor.offset,
            limit: listing.cursor.limit,
        })
    }

    /// Record a loaded page. Known SKUs are re-shown, unknown ones appended.
    /// Returns the SKUs that were new to the grid.
    pub fn apply_page(&mut self, section_id: u64, skus: &[String], has_more: bool) -> Vec<String> {
        let Some(listing) = self.listing.as_mut().filter(|l| l.section_id == section_id) else {
            debug!(section_id, "dropping page for a section that is no longer open");
            return Vec::new();
        };
        listing.cursor.offset += listing.cursor.limit;
        listing.has_more = has_more;
        listing.loading = false;

        let mut added = Vec::new();
        for sku in skus {
            match self.products.iter_mut().find(|p| &p.sku == sku) {
                Some(existing) => {
                    existing.visible = true;
                    if existing.section_id.is_none() {
                        existing.section_id = Some(section_id);
                    }
                }
                None => {
                    self.products.push(ProductEntry {
                        sku: sku.clone(),
                        section_id: Some(section_id),
                        category_id: None,
                        visible: true,
                    });
                    added.push(sku.clone());
                }
            }
        }
        added
    }

    /// A page request failed; re-enable the control for a manual retry.
    pub fn page_failed(&mut self, section_id: u64) {
        if let Some(listing) = self.listing.as_mut().filter(|l| l.section_id == section_id) {
            listing.loading = false;
        }
    }

    // ── Category grid ──

    fn category_with_descendants(&self, category_id: u64) -> HashSet<u64> {
        let mut ids = HashSet::new();
        let mut stack = vec![NodeKey::category(category_id)];
        while let Some(key) = stack.pop() {
            if key.kind != NodeKind::Category || !ids.insert(key.id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&key) {
                stack.extend(node.children.iter().copied());
            }
        }
        ids
    }

    /// Show up to one batch of products from a category and its descendant
    /// categories; `0` shows everything. When no product carries a category
    /// at all, the first batch is shown regardless. Returns the shown count.
    pub fn filter_by_category(&mut self, category_id: u64) -> usize {
        self.leave_listing();
        self.grid_visible = true;
        self.show_more_enabled = false;
        if category_id == 0 {
            for p in &mut self.products {
                p.visible = true;
            }
            return self.products.len();
        }

        let ids = self.category_with_descendants(category_id);
        let untagged = self.products.iter().all(|p| p.category_id.is_none());
        let batch = self.grid_batch;
        let mut shown = 0;
        for p in &mut self.products {
            let matches = untagged || p.category_id.is_some_and(|c| ids.contains(&c));
            p.visible = matches && shown < batch;
            shown += usize::from(p.visible);
        }
        shown
    }

    /// Reveal the next batch of hidden grid products. Returns how many
    /// remain hidden.
    pub fn show_more(&mut self) -> usize {
        let mut budget = self.grid_batch;
        for p in self.products.iter_mut().filter(|p| !p.visible) {
            if budget == 0 {
                break;
            }
            p.visible = true;
            budget -= 1;
        }
        self.remaining_hidden()
    }

    pub fn remaining_hidden(&self) -> usize {
        self.products.iter().filter(|p| !p.visible).count()
    }
}

/// A flat group where at most one item is open, such as FAQ entries.
/// Items are root siblings of a private tree, so the rule is the same one
/// the catalog applies to its levels.
#[derive(Debug, Clone, Default)]
pub struct Accordion {
    tree: CatalogTree,
}

impl Accordion {
    pub fn new(len: usize) -> Self {
        let mut tree = CatalogTree::default();
        for index in 0..len {
            tree.insert(Self::key(index), None);
        }
        Self { tree }
    }

    fn key(index: usize) -> NodeKey {
        NodeKey::category(index as u64)
    }

    pub fn toggle(&mut self, index: usize) -> Option<Transition> {
        self.tree.toggle(Self::key(index))
    }

    pub fn is_open(&self, index: usize) -> bool {
        self.tree.is_expanded(Self::key(index))
    }
}

/// SKUs (`data-product` attributes) in a server-rendered page of product
/// cards, in order and without repeats.
pub fn product_skus(html: &str) -> Vec<String> {
    const ATTR: &str = "data-product=";
    let mut skus: Vec<String> = Vec::new();
    let mut rest = html;
    while let Some(pos) = rest.find(ATTR) {
        // Reject names that merely end in `data-product`.
        let preceded_ok = !rest[..pos].ends_with(|c: char| c.is_alphanumeric() || c == '-');
        rest = &rest[pos + ATTR.len()..];
        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let Some(end) = rest[1..].find(quote) else {
            break;
        };
        let sku = rest[1..1 + end].trim();
        if preceded_ok && !sku.is_empty() && !skus.iter().any(|s| s == sku) {
            skus.push(sku.to_owned());
        }
        rest = &rest[1 + end..];
    }
    skus
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_client::memory::InMemoryStorefront;
    use shop_client::StorefrontApi;

    /// Two categories, each with two subcategories, each with two sections.
    fn sample() -> CatalogTree {
        let mut tree = CatalogTree::default();
        for c in 1..=2 {
            tree.insert(NodeKey::category(c), None);
            for s in 0..2 {
                let sub = NodeKey::subcategory(c * 10 + s);
                tree.insert(sub, Some(NodeKey::category(c)));
                for sec in 0..2 {
                    tree.insert(NodeKey::section(c * 100 + s * 10 + sec), Some(sub));
                }
            }
        }
        tree
    }

    fn expanded_siblings(tree: &CatalogTree) -> bool {
        tree.nodes.keys().all(|k| {
            !tree.is_expanded(*k) || tree.siblings(*k).into_iter().all(|s| !tree.is_expanded(s))
        })
    }

    #[test]
    fn toggle_opens_then_closes() {
        let mut tree = sample();
        let key = NodeKey::category(1);
        assert_eq!(tree.toggle(key), Some(Transition::Expanded));
        assert!(tree.is_expanded(key));
        assert_eq!(tree.toggle(key), Some(Transition::Collapsed));
        assert!(!tree.is_expanded(key));
        assert_eq!(tree.toggle(NodeKey::category(99)), None);
    }

    #[test]
    fn at_most_one_sibling_open_after_any_click() {
        let mut tree = sample();
        let clicks = [
            NodeKey::category(1),
            NodeKey::subcategory(10),
            NodeKey::subcategory(11),
            NodeKey::category(2),
            NodeKey::subcategory(20),
            NodeKey::subcategory(21),
            NodeKey::category(1),
            NodeKey::section(110),
            NodeKey::section(111),
            NodeKey::section(200),
        ];
        for key in clicks {
            tree.toggle(key);
            assert!(expanded_siblings(&tree), "after {key:?}");
        }
        assert!(!tree.is_expanded(NodeKey::subcategory(10)));
        assert!(tree.is_expanded(NodeKey::subcategory(11)));
    }

    #[test]
    fn projection_follows_expanded_flags() {
        let mut tree = sample();
        let roots: BTreeSet<_> = [NodeKey::category(1), NodeKey::category(2)].into();
        assert_eq!(tree.visible_nodes(), roots);

        tree.toggle(NodeKey::category(1));
        let visible = tree.visible_nodes();
        assert!(visible.contains(&NodeKey::subcategory(10)));
        assert!(!visible.contains(&NodeKey::section(100)));
        assert!(!visible.contains(&NodeKey::subcategory(20)));

        tree.toggle(NodeKey::subcategory(10));
        assert!(tree.visible_nodes().contains(&NodeKey::section(101)));

        // Collapsing the category hides the subtree but keeps the inner flag.
        tree.toggle(NodeKey::category(1));
        assert!(!tree.visible_nodes().contains(&NodeKey::section(101)));
        assert!(tree.is_expanded(NodeKey::subcategory(10)));
    }

    #[test]
    fn section_switches_to_paged_listing() {
        let mut tree = sample();
        for i in 0..12 {
            tree.add_product(&format!("A{i}"), Some(100), Some(1), true);
        }
        tree.add_product("B0", Some(101), Some(1), true);

        tree.toggle(NodeKey::section(100));
        let view = tree.view();
        assert!(view.listing_mode);
        assert!(view.visible_nodes.is_empty());
        assert_eq!(view.visible_products.len(), 9);
        assert!(!view.visible_products.contains(&"B0".to_owned()));
        assert_eq!(view.load_more, Some(LoadMoreCursor { offset: 9, limit: 9 }));
        assert!(!view.show_more_visible);

        tree.toggle(NodeKey::section(100));
        let view = tree.view();
        assert!(!view.listing_mode);
        assert_eq!(view.load_more, None);
        assert!(!view.visible_nodes.is_empty());
    }

    #[test]
    fn small_section_has_no_load_more() {
        let mut tree = sample();
        for i in 0..9 {
            tree.add_product(&format!("A{i}"), Some(100), None, false);
        }
        tree.toggle(NodeKey::section(100));
        assert_eq!(tree.view().load_more, None);
        assert_eq!(tree.next_page(), None);
    }

    #[test]
    fn load_more_advances_cursor_and_dedupes() {
        let mut tree = sample();
        for i in 0..10 {
            tree.add_product(&format!("A{i}"), Some(100), None, false);
        }
        tree.toggle(NodeKey::section(100));

        let query = tree.next_page().unwrap();
        assert_eq!((query.offset, query.limit), (9, 9));
        // In flight: a second click does nothing.
        assert_eq!(tree.next_page(), None);
        assert!(tree.view().load_more_busy);

        let page: Vec<String> = ["A9", "N1", "N2"].iter().map(|s| s.to_string()).collect();
        let added = tree.apply_page(100, &page, true);
        assert_eq!(added, vec!["N1".to_owned(), "N2".to_owned()]);
        assert_eq!(tree.view().visible_products.len(), 12);

        let query = tree.next_page().unwrap();
        assert_eq!(query.offset, 18);
        tree.page_failed(100);
        assert_eq!(tree.next_page().map(|q| q.offset), Some(18));
        tree.apply_page(100, &[], false);
        assert_eq!(tree.view().load_more, None);
    }

    #[test]
    fn stale_page_is_ignored() {
        let mut tree = sample();
        for i in 0..20 {
            tree.add_product(&format!("A{i}"), Some(100), None, false);
        }
        tree.toggle(NodeKey::section(100));
        assert!(tree.next_page().is_some());
        tree.toggle(NodeKey::section(100));
        assert!(tree.apply_page(100, &["Z".to_owned()], false).is_empty());
        assert!(tree.products().iter().all(|p| p.sku != "Z"));
    }

    #[test]
    fn opening_a_category_leaves_listing_mode() {
        let mut tree = sample();
        tree.toggle(NodeKey::section(100));
        tree.toggle(NodeKey::category(2));
        assert!(tree.listing().is_none());
        assert!(!tree.is_expanded(NodeKey::section(100)));
    }

    #[test]
    fn open_category_expands_ancestors_and_descendants() {
        let mut tree = CatalogTree::default();
        tree.insert(NodeKey::category(1), None);
        tree.insert(NodeKey::category(2), Some(NodeKey::category(1)));
        tree.insert(NodeKey::category(3), Some(NodeKey::category(2)));
        tree.insert(NodeKey::subcategory(30), Some(NodeKey::category(3)));
        tree.insert(NodeKey::section(300), Some(NodeKey::subcategory(30)));

        let opened = tree.open_category(2);
        assert!(tree.is_expanded(NodeKey::category(1)));
        assert!(tree.is_expanded(NodeKey::category(2)));
        assert!(tree.is_expanded(NodeKey::category(3)));
        assert!(tree.is_expanded(NodeKey::subcategory(30)));
        assert!(!tree.is_expanded(NodeKey::section(300)));
        assert_eq!(opened.len(), 4);
        assert!(tree.visible_nodes().contains(&NodeKey::section(300)));
    }

    #[test]
    fn open_category_terminates_on_cycles() {
        let mut tree = CatalogTree::default();
        tree.insert(NodeKey::category(1), None);
        tree.insert(NodeKey::category(2), Some(NodeKey::category(1)));
        tree.insert(NodeKey::category(3), Some(NodeKey::category(2)));
        // Close the loop: 1 → 2 → 3 → 1.
        tree.insert(NodeKey::category(1), Some(NodeKey::category(3)));

        let opened = tree.open_category(2);
        let unique: HashSet<_> = opened.iter().collect();
        assert_eq!(unique.len(), opened.len());
        assert_eq!(unique.len(), 3);

        assert_eq!(tree.category_with_descendants(1).len(), 3);
        // No roots remain, so nothing is visible, but projection still ends.
        assert!(tree.visible_nodes().is_empty());
    }

    #[test]
    fn open_category_respects_depth_limit() {
        let mut tree = CatalogTree::default();
        tree.insert(NodeKey::category(0), None);
        for id in 1..15 {
            tree.insert(NodeKey::category(id), Some(NodeKey::category(id - 1)));
        }
        let opened = tree.open_category(0);
        // Depths 0 through 10 inclusive.
        assert_eq!(opened.len(), 11);
        assert!(tree.is_expanded(NodeKey::category(10)));
        assert!(!tree.is_expanded(NodeKey::category(11)));
    }

    #[test]
    fn filter_by_category_includes_descendants_and_caps() {
        let mut tree = CatalogTree::default();
        tree.insert(NodeKey::category(1), None);
        tree.insert(NodeKey::category(2), Some(NodeKey::category(1)));
        tree.insert(NodeKey::category(3), None);
        for i in 0..20 {
            tree.add_product(&format!("P{i}"), None, Some(1), true);
            tree.add_product(&format!("C{i}"), None, Some(2), true);
        }
        tree.add_product("X", None, Some(3), true);

        assert_eq!(tree.filter_by_category(1), 24);
        let view = tree.view();
        assert!(!view.visible_products.contains(&"X".to_owned()));
        assert!(!view.show_more_visible);

        assert_eq!(tree.filter_by_category(3), 1);
        assert_eq!(tree.filter_by_category(0), 41);
    }

    #[test]
    fn filter_without_category_tags_shows_first_batch() {
        let mut tree = CatalogTree::default();
        tree.insert(NodeKey::category(1), None);
        for i in 0..30 {
            tree.add_product(&format!("P{i}"), None, None, true);
        }
        assert_eq!(tree.filter_by_category(1), 24);
        assert_eq!(tree.view().visible_products.first().map(String::as_str), Some("P0"));
    }

    #[test]
    fn closing_a_section_hides_the_grid_until_filtered() {
        let mut tree = sample();
        tree.add_product("A0", Some(100), Some(1), true);
        assert!(tree.view().product_list_visible);
        tree.toggle(NodeKey::section(100));
        assert!(tree.view().product_list_visible);
        tree.toggle(NodeKey::section(100));
        assert!(!tree.view().product_list_visible);
        tree.filter_by_category(0);
        assert!(tree.view().product_list_visible);
    }

    #[test]
    fn extracts_skus_from_card_markup() {
        let html = concat!(
            r#"<div class="column"><div class="product-box" data-product="SKU-1" data-product-id="5">"#,
            r#"</div></div><div class="column"><div class="product-box" data-product='SKU-2'></div></div>"#,
            r#"<div class="product-box" data-product="SKU-1"></div><a data-product="">x</a>"#,
        );
        assert_eq!(product_skus(html), vec!["SKU-1".to_owned(), "SKU-2".to_owned()]);
        assert!(product_skus("<p>нет товаров</p>").is_empty());
    }

    #[tokio::test]
    async fn pages_through_a_section_from_the_server() -> anyhow::Result<()> {
        let cards: Vec<String> = (0..20)
            .map(|i| format!(r#"<div class="column"><div class="product-box" data-product="S{i}"></div></div>"#))
            .collect();
        let api = InMemoryStorefront::new().with_section(7, cards);

        let mut tree = CatalogTree::default();
        tree.insert(NodeKey::section(7), None);
        for i in 0..9 {
            tree.add_product(&format!("S{i}"), Some(7), None, false);
        }
        // The server knows more than the page rendered.
        tree.add_product("S9", Some(7), None, false);
        tree.toggle(NodeKey::section(7));

        let mut pages = 0;
        while let Some(query) = tree.next_page() {
            let resp = api.section_products(query).await?;
            tree.apply_page(query.section_id, &product_skus(&resp.html), resp.has_more);
            pages += 1;
        }
        assert_eq!(pages, 2);
        assert_eq!(tree.view().visible_products.len(), 20);
        assert_eq!(tree.products().len(), 20);
        Ok(())
    }

    #[test]
    fn section_list_decides_membership_over_item_tags() {
        let mut tree = sample();
        // Grid items carry no section tag at all.
        for i in 0..12 {
            tree.add_product(&format!("G{i}"), None, Some(1), true);
        }
        let listed: Vec<String> = ["G11", "G3", "X-not-in-grid"]
            .iter()
            .map(|s| s.to_string())
            .chain((0..8).map(|i| format!("G{i}")))
            .collect();
        tree.assign_section(100, &listed);

        tree.toggle(NodeKey::section(100));
        let view = tree.view();
        assert!(view.listing_mode);
        // Listed SKUs present in the grid, G3 counted once: nine of them.
        assert_eq!(view.visible_products.len(), 9);
        assert!(view.visible_products.contains(&"G11".to_owned()));
        assert!(view.visible_products.contains(&"G7".to_owned()));
        assert!(!view.visible_products.contains(&"G8".to_owned()));
        // Ten distinct listed SKUs exceed one page.
        assert_eq!(view.load_more, Some(LoadMoreCursor { offset: 9, limit: 9 }));
    }

    #[test]
    fn section_list_applies_to_products_added_later() {
        let mut tree = sample();
        tree.assign_section(101, &["L1".to_owned()]);
        tree.add_product("L1", None, None, false);
        tree.add_product("T1", Some(101), None, false);
        tree.toggle(NodeKey::section(101));
        assert_eq!(tree.view().visible_products, vec!["L1".to_owned()]);
        assert_eq!(tree.products()[0].section_id, Some(101));
    }

    #[test]
    fn untagged_list_falls_back_to_item_tags() {
        let mut tree = sample();
        tree.add_product("A", Some(110), None, false);
        tree.assign_section(110, &["missing".to_owned()]);
        tree.toggle(NodeKey::section(110));
        assert_eq!(tree.view().visible_products, vec!["A".to_owned()]);
    }

    #[test]
    fn accordion_keeps_one_item_open() {
        let mut faq = Accordion::new(3);
        assert_eq!(faq.toggle(0), Some(Transition::Expanded));
        assert_eq!(faq.toggle(2), Some(Transition::Expanded));
        assert!(!faq.is_open(0));
        assert!(faq.is_open(2));
        assert_eq!(faq.toggle(2), Some(Transition::Collapsed));
        assert!((0..3).all(|i| !faq.is_open(i)));
        assert_eq!(faq.toggle(7), None);
    }

    #[test]
    fn show_more_reveals_batches() {
        let mut tree = CatalogTree::default();
        for i in 0..60 {
            tree.add_product(&format!("P{i}"), None, None, i < 10);
        }
        assert!(tree.view().show_more_visible);
        assert_eq!(tree.show_more(), 26);
        assert_eq!(tree.show_more(), 2);
        assert_eq!(tree.show_more(), 0);
        assert!(!tree.view().show_more_visible);
    }
}
