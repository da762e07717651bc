//! Cart store and cart operations.
//!
//! `CartStore` is the single owner of the client's copy of the server cart.
//! Every write replaces the snapshot wholesale and notifies subscribers;
//! nothing is merged or recomputed locally. `CartService` runs the API calls
//! and routes their results into the store.

use crate::forms::{FormOutcome, OrderForm};
use crate::price::{normalize_price, price_from_label, QuantityBounds};
use shop_api_types::{AddCartItemRequest, CartSnapshot, ProductId, RemoveCartItemRequest};
use shop_client::{ApiError, StorefrontApi};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{error, info, warn};

pub const MSG_PRODUCT_UNRESOLVED: &str =
    "Ошибка: не удалось определить данные товара. Попробуйте обновить страницу.";
pub const MSG_ADD_FAILED: &str = "Не удалось добавить товар в корзину.";
pub const MSG_REMOVE_FAILED: &str = "Не удалось удалить товар.";
pub const MSG_CLEAR_FAILED: &str = "Не удалось очистить корзину.";
pub const MSG_ORDER_FAILED: &str = "Не удалось оформить заказ. Попробуйте позже.";
pub const MSG_ORDER_OK: &str = "Заказ оформлен. Мы свяжемся с вами.";

type Subscriber = Rc<dyn Fn(&CartSnapshot)>;

#[derive(Clone, Default)]
pub struct CartStore {
    snapshot: Rc<RefCell<CartSnapshot>>,
    subscribers: Rc<RefCell<Vec<Subscriber>>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    pub fn subscribe(&self, f: impl Fn(&CartSnapshot) + 'static) {
        self.subscribers.borrow_mut().push(Rc::new(f));
    }

    /// Replace the snapshot and notify every subscriber with it.
    ///
    /// Borrows are released before subscribers run, so a subscriber may read
    /// or even replace the store again.
    pub fn replace(&self, next: CartSnapshot) {
        *self.snapshot.borrow_mut() = next.clone();
        let subscribers = self.subscribers.borrow().clone();
        for notify in subscribers {
            notify(&next);
        }
    }
}

/// Where user-facing failures go. The browser implementation shows a
/// blocking alert.
pub trait Notifier {
    fn alert(&self, message: &str);
}

/// Product data as scraped around an add-to-cart button: the button's own
/// data attributes first, then the enclosing product card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductSource {
    pub data_product_id: Option<String>,
    pub data_id: Option<String>,
    pub data_title: Option<String>,
    pub data_sku: Option<String>,
    pub data_price: Option<String>,
    pub card_title: Option<String>,
    pub card_image_alt: Option<String>,
    pub card_sku_label: Option<String>,
    pub card_price_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProduct {
    pub product_id: ProductId,
    pub title: String,
    pub sku: String,
    pub price: String,
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

impl ProductSource {
    /// Resolve id, title, SKU and normalized price. `None` when the id or
    /// title cannot be found anywhere.
    pub fn resolve(&self) -> Option<ResolvedProduct> {
        let product_id = non_blank(&self.data_product_id)
            .or_else(|| non_blank(&self.data_id))
            .and_then(|raw| ProductId::parse(&raw))?;
        let title = non_blank(&self.data_title)
            .or_else(|| non_blank(&self.card_title))
            .or_else(|| non_blank(&self.card_image_alt))?;
        let sku = non_blank(&self.data_sku)
            .or_else(|| {
                self.card_sku_label
                    .as_deref()
                    .map(|label| label.replace("Маркировка:", "").trim().to_owned())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_default();
        let price = non_blank(&self.data_price)
            .or_else(|| self.card_price_label.as_deref().map(price_from_label))
            .unwrap_or_default();
        Some(ResolvedProduct {
            product_id,
            title,
            sku,
            price: normalize_price(&price),
        })
    }
}

pub struct CartService<A> {
    api: Rc<A>,
    store: CartStore,
    notifier: Rc<dyn Notifier>,
    bounds: QuantityBounds,
}

impl<A> Clone for CartService<A> {
    fn clone(&self) -> Self {
        Self {
            api: Rc::clone(&self.api),
            store: self.store.clone(),
            notifier: Rc::clone(&self.notifier),
            bounds: self.bounds,
        }
    }
}

impl<A: StorefrontApi> CartService<A> {
    pub fn new(api: Rc<A>, store: CartStore, notifier: Rc<dyn Notifier>, bounds: QuantityBounds) -> Self {
        Self {
            api,
            store,
            notifier,
            bounds,
        }
    }

    pub fn store(&self) -> &CartStore {
        &self.store
    }

    /// Load the server cart. Any failure leaves an empty cart rather than a
    /// stale one; subscribers are notified either way.
    pub async fn fetch_cart(&self) -> CartSnapshot {
        let snapshot = match self.api.get_cart().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!("cart load failed: {}", err);
                CartSnapshot::empty()
            }
        };
        self.store.replace(snapshot.clone());
        snapshot
    }

    /// Add `quantity` of a product. Returns the request that was sent, or
    /// `None` if nothing was sent or the server refused it.
    pub async fn add_to_cart(&self, source: &ProductSource, quantity: u32) -> Option<AddCartItemRequest> {
        let Some(product) = source.resolve() else {
            warn!("add to cart: product id or title missing");
            self.notifier.alert(MSG_PRODUCT_UNRESOLVED);
            return None;
        };
        let req = AddCartItemRequest {
            product_id: product.product_id,
            title: product.title,
            sku: product.sku,
            price: product.price,
            quantity: self.bounds.clamp(i64::from(quantity)),
        };
        match self.api.add_cart_item(&req).await {
            Ok(snapshot) => {
                info!(product = %req.product_id, quantity = req.quantity, "added to cart");
                self.store.replace(snapshot);
                Some(req)
            }
            Err(err) => {
                self.report(&err, MSG_ADD_FAILED);
                None
            }
        }
    }

    pub async fn remove_from_cart(&self, product_id: &ProductId) {
        let req = RemoveCartItemRequest {
            product_id: product_id.clone(),
        };
        match self.api.remove_cart_item(&req).await {
            Ok(snapshot) => self.store.replace(snapshot),
            Err(err) => self.report(&err, MSG_REMOVE_FAILED),
        }
    }

    pub async fn clear_cart(&self) {
        match self.api.clear_cart().await {
            Ok(snapshot) => self.store.replace(snapshot),
            Err(err) => self.report(&err, MSG_CLEAR_FAILED),
        }
    }

    /// Validate and place an order for the current cart, then reload the
    /// cart from the server on success.
    pub async fn submit_order(&self, form: &OrderForm) -> FormOutcome {
        let req = match form.validate(self.store.is_empty()) {
            Ok(req) => req,
            Err(err) => return FormOutcome::Invalid(err),
        };
        match self.api.submit_order(&req).await {
            Ok(resp) => {
                let message = resp
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| MSG_ORDER_OK.to_owned());
                self.fetch_cart().await;
                FormOutcome::Sent(message)
            }
            Err(err) => {
                warn!("order failed: {}", err);
                FormOutcome::Failed(err.user_message().unwrap_or(MSG_ORDER_FAILED).to_owned())
            }
        }
    }

    fn report(&self, err: &ApiError, fallback: &str) {
        error!("{}: {}", fallback, err);
        self.notifier.alert(err.user_message().unwrap_or(fallback));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::ValidationError;
    use shop_client::endpoints;
    use shop_client::memory::InMemoryStorefront;

    #[derive(Default)]
    struct RecordingNotifier {
        alerts: RefCell<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn alert(&self, message: &str) {
            self.alerts.borrow_mut().push(message.to_owned());
        }
    }

    fn service() -> (CartService<InMemoryStorefront>, Rc<InMemoryStorefront>, Rc<RecordingNotifier>) {
        let api = Rc::new(InMemoryStorefront::new());
        let notifier = Rc::new(RecordingNotifier::default());
        let svc = CartService::new(
            Rc::clone(&api),
            CartStore::new(),
            notifier.clone(),
            QuantityBounds::default(),
        );
        (svc, api, notifier)
    }

    fn widget() -> ProductSource {
        ProductSource {
            data_product_id: Some("42".into()),
            data_title: Some("Widget".into()),
            data_price: Some("1 234,50".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn add_posts_normalized_payload() -> anyhow::Result<()> {
        let (svc, api, _) = service();
        svc.add_to_cart(&widget(), 2).await;

        let calls = api.calls_to(endpoints::CART_ITEMS);
        assert_eq!(calls.len(), 1);
        let body = calls[0].body.clone().unwrap_or_default();
        assert_eq!(
            body,
            serde_json::json!({
                "product_id": 42,
                "title": "Widget",
                "sku": "",
                "price": "1234.50",
                "quantity": 2
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn mutations_replace_state_wholesale() -> anyhow::Result<()> {
        let (svc, api, _) = service();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        svc.store().subscribe(move |s| sink.borrow_mut().push(s.total_amount.clone()));

        svc.add_to_cart(&widget(), 2).await;
        assert_eq!(svc.store().snapshot().total_amount, "2469.00");

        // The server's view wins even when it disagrees with local history.
        api.remove_cart_item(&RemoveCartItemRequest { product_id: ProductId::Number(42) })
            .await?;
        svc.fetch_cart().await;
        assert_eq!(svc.store().snapshot(), CartSnapshot::empty());
        assert_eq!(*seen.borrow(), vec!["2469.00".to_owned(), "0.00".to_owned()]);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_failure_renders_empty_cart() -> anyhow::Result<()> {
        let (svc, api, notifier) = service();
        svc.add_to_cart(&widget(), 1).await;
        api.fail_next(ApiError::Network("offline".into()));

        let renders = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&renders);
        svc.store().subscribe(move |_| *counter.borrow_mut() += 1);

        let cart = svc.fetch_cart().await;
        assert_eq!(cart.items, vec![]);
        assert_eq!(cart.total_quantity, 0);
        assert_eq!(cart.total_amount, "0.00");
        assert_eq!(*renders.borrow(), 1);
        assert!(notifier.alerts.borrow().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unresolvable_product_alerts_without_request() -> anyhow::Result<()> {
        let (svc, api, notifier) = service();
        let source = ProductSource {
            data_product_id: Some("42".into()),
            ..Default::default()
        };
        assert!(svc.add_to_cart(&source, 1).await.is_none());
        assert!(api.calls().is_empty());
        assert_eq!(*notifier.alerts.borrow(), vec![MSG_PRODUCT_UNRESOLVED.to_owned()]);
        Ok(())
    }

    #[tokio::test]
    async fn add_failure_surfaces_server_message() -> anyhow::Result<()> {
        let (svc, api, notifier) = service();
        api.fail_next(ApiError::Status { status: 400, message: Some("Не указан товар.".into()) });
        svc.add_to_cart(&widget(), 1).await;
        api.fail_next(ApiError::Network("offline".into()));
        svc.add_to_cart(&widget(), 1).await;
        assert_eq!(
            *notifier.alerts.borrow(),
            vec!["Не указан товар.".to_owned(), MSG_ADD_FAILED.to_owned()]
        );
        assert!(svc.store().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn quantity_is_clamped_before_sending() -> anyhow::Result<()> {
        let (svc, _, _) = service();
        let sent = svc.add_to_cart(&widget(), 5000).await;
        assert_eq!(sent.map(|r| r.quantity), Some(999));
        let sent = svc.add_to_cart(&widget(), 0).await;
        assert_eq!(sent.map(|r| r.quantity), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn remove_and_clear_failures_keep_state_and_alert() -> anyhow::Result<()> {
        let (svc, api, notifier) = service();
        svc.add_to_cart(&widget(), 1).await;
        let before = svc.store().snapshot();

        api.fail_next(ApiError::Network("offline".into()));
        svc.remove_from_cart(&ProductId::Number(42)).await;
        api.fail_next(ApiError::Status { status: 500, message: None });
        svc.clear_cart().await;

        assert_eq!(svc.store().snapshot(), before);
        assert_eq!(
            *notifier.alerts.borrow(),
            vec![MSG_REMOVE_FAILED.to_owned(), MSG_CLEAR_FAILED.to_owned()]
        );

        svc.clear_cart().await;
        assert!(svc.store().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn order_with_empty_name_never_hits_network() -> anyhow::Result<()> {
        let (svc, api, _) = service();
        svc.add_to_cart(&widget(), 1).await;
        let form = OrderForm {
            name: "  ".into(),
            phone: "+7 700 000 00 00".into(),
            ..Default::default()
        };
        let outcome = svc.submit_order(&form).await;
        assert_eq!(outcome, FormOutcome::Invalid(ValidationError::NameRequired));
        assert_eq!(outcome.message(), "Укажите имя.");
        assert!(api.calls_to(endpoints::ORDERS).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn order_success_refetches_cart() -> anyhow::Result<()> {
        let (svc, api, _) = service();
        svc.add_to_cart(&widget(), 1).await;
        let form = OrderForm {
            name: "Анна".into(),
            email: "anna@example.com".into(),
            ..Default::default()
        };
        let outcome = svc.submit_order(&form).await;
        assert!(matches!(outcome, FormOutcome::Sent(_)));
        assert_eq!(api.calls_to(endpoints::CART).len(), 1);
        assert!(svc.store().is_empty());
        Ok(())
    }

    #[test]
    fn resolves_from_card_markup() {
        let source = ProductSource {
            data_id: Some("17".into()),
            card_title: Some("  Кабель ВВГ  ".into()),
            card_sku_label: Some("Маркировка: ВВГ-3x2.5".into()),
            card_price_label: Some("1 200,00 тг".into()),
            ..Default::default()
        };
        let product = source.resolve().unwrap();
        assert_eq!(product.product_id, ProductId::Number(17));
        assert_eq!(product.title, "Кабель ВВГ");
        assert_eq!(product.sku, "ВВГ-3x2.5");
        assert_eq!(product.price, "1200.00");
    }

    #[test]
    fn image_alt_is_last_resort_title() {
        let source = ProductSource {
            data_product_id: Some("3".into()),
            card_image_alt: Some("Лампа".into()),
            ..Default::default()
        };
        assert_eq!(source.resolve().map(|p| p.title), Some("Лампа".into()));
    }
}
