//! In-memory storefront backend.
//!
//! Behaves like the session-backed server: quantities accumulate per product
//! and are clamped to 1..=999, totals are recomputed in whole cents, orders
//! empty the cart. Every call is recorded so tests can assert on the exact
//! request bodies (or on the absence of requests).

use crate::{endpoints, ApiError, ApiResult, FormPost, StorefrontApi};
use async_trait::async_trait;
use serde::Serialize;
use shop_api_types::{
    AddCartItemRequest, CartItem, CartSnapshot, LeadRequest, OrderRequest, ProductId,
    RemoveCartItemRequest, SectionProductsQuery, SectionProductsResponse, SubmitResponse,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
struct StoredLine {
    product_id: ProductId,
    title: String,
    sku: String,
    price_cents: i64,
    quantity: u32,
}

#[derive(Default)]
struct Inner {
    lines: Vec<StoredLine>,
    sections: HashMap<u64, Vec<String>>,
    details: HashMap<String, String>,
    failures: VecDeque<ApiError>,
    calls: Vec<RecordedCall>,
}

#[derive(Default)]
pub struct InMemoryStorefront {
    inner: RefCell<Inner>,
}

impl InMemoryStorefront {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register product card fragments for a section, in display order.
    pub fn with_section(self, section_id: u64, cards: Vec<String>) -> Self {
        self.inner.borrow_mut().sections.insert(section_id, cards);
        self
    }

    pub fn with_product_detail(self, id: &str, html: &str) -> Self {
        self.inner
            .borrow_mut()
            .details
            .insert(id.to_owned(), html.to_owned());
        self
    }

    /// Make the next call fail with `err` instead of touching state.
    pub fn fail_next(&self, err: ApiError) {
        self.inner.borrow_mut().failures.push_back(err);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.borrow().calls.clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<RecordedCall> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .cloned()
            .collect()
    }

    fn record<B: Serialize>(&self, endpoint: &str, body: Option<&B>) -> ApiResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(RecordedCall {
            endpoint: endpoint.to_owned(),
            body: body.and_then(|b| serde_json::to_value(b).ok()),
        });
        match inner.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn snapshot(&self) -> CartSnapshot {
        let inner = self.inner.borrow();
        let mut total_quantity = 0;
        let mut total_cents = 0;
        let items = inner
            .lines
            .iter()
            .map(|line| {
                let subtotal = line.price_cents * i64::from(line.quantity);
                total_quantity += line.quantity;
                total_cents += subtotal;
                CartItem {
                    product_id: line.product_id.clone(),
                    title: line.title.clone(),
                    sku: line.sku.clone(),
                    price: Some(format_cents(line.price_cents)),
                    quantity: line.quantity,
                    subtotal: format_cents(subtotal),
                }
            })
            .collect();
        CartSnapshot {
            items,
            total_quantity,
            total_amount: format_cents(total_cents),
        }
    }
}

fn missing_contact(name: &str, phone: &str, email: &str) -> Option<ApiError> {
    let message = if name.trim().is_empty() {
        "Укажите имя."
    } else if phone.trim().is_empty() && email.trim().is_empty() {
        "Укажите телефон или email."
    } else {
        return None;
    };
    Some(ApiError::Status {
        status: 400,
        message: Some(message.to_owned()),
    })
}

#[async_trait(?Send)]
impl StorefrontApi for InMemoryStorefront {
    async fn get_cart(&self) -> ApiResult<CartSnapshot> {
        self.record::<()>(endpoints::CART, None)?;
        Ok(self.snapshot())
    }

    async fn add_cart_item(&self, req: &AddCartItemRequest) -> ApiResult<CartSnapshot> {
        self.record(endpoints::CART_ITEMS, Some(req))?;
        if req.title.trim().is_empty() {
            return Err(ApiError::Status {
                status: 400,
                message: Some("Не указан товар.".to_owned()),
            });
        }
        {
            let mut inner = self.inner.borrow_mut();
            let price_cents = parse_price_cents(&req.price);
            match inner.lines.iter().position(|l| l.product_id == req.product_id) {
                Some(idx) => {
                    let line = &mut inner.lines[idx];
                    line.quantity = (line.quantity + req.quantity).clamp(1, 999);
                    line.title = req.title.trim().to_owned();
                    line.sku = req.sku.trim().to_owned();
                    line.price_cents = price_cents;
                }
                None if req.quantity > 0 => inner.lines.push(StoredLine {
                    product_id: req.product_id.clone(),
                    title: req.title.trim().to_owned(),
                    sku: req.sku.trim().to_owned(),
                    price_cents,
                    quantity: req.quantity.min(999),
                }),
                None => {}
            }
        }
        Ok(self.snapshot())
    }

    async fn remove_cart_item(&self, req: &RemoveCartItemRequest) -> ApiResult<CartSnapshot> {
        self.record(endpoints::CART_ITEMS_REMOVE, Some(req))?;
        self.inner
            .borrow_mut()
            .lines
            .retain(|l| l.product_id != req.product_id);
        Ok(self.snapshot())
    }

    async fn clear_cart(&self) -> ApiResult<CartSnapshot> {
        self.record::<()>(endpoints::CART_CLEAR, None)?;
        self.inner.borrow_mut().lines.clear();
        Ok(self.snapshot())
    }

    async fn submit_lead(&self, req: &LeadRequest) -> ApiResult<SubmitResponse> {
        self.record(endpoints::LEADS, Some(req))?;
        if let Some(err) = missing_contact(&req.name, &req.phone, &req.email) {
            return Err(err);
        }
        Ok(SubmitResponse {
            success: true,
            message: Some("Заявка принята.".to_owned()),
        })
    }

    async fn submit_order(&self, req: &OrderRequest) -> ApiResult<SubmitResponse> {
        self.record(endpoints::ORDERS, Some(req))?;
        if let Some(err) = missing_contact(&req.name, &req.phone, &req.email) {
            return Err(err);
        }
        let mut inner = self.inner.borrow_mut();
        if inner.lines.is_empty() {
            return Err(ApiError::Status {
                status: 400,
                message: Some("Корзина пуста.".to_owned()),
            });
        }
        inner.lines.clear();
        Ok(SubmitResponse {
            success: true,
            message: Some("Заказ принят. Мы свяжемся с вами для подтверждения.".to_owned()),
        })
    }

    async fn section_products(&self, query: SectionProductsQuery) -> ApiResult<SectionProductsResponse> {
        self.record(endpoints::SECTION_PRODUCTS, Some(&query))?;
        let inner = self.inner.borrow();
        let Some(cards) = inner.sections.get(&query.section_id) else {
            return Err(ApiError::Status {
                status: 404,
                message: Some("Раздел не найден".to_owned()),
            });
        };
        let start = (query.offset as usize).min(cards.len());
        let end = (start + query.limit as usize).min(cards.len());
        Ok(SectionProductsResponse {
            success: true,
            html: cards[start..end].concat(),
            has_more: ((query.offset + query.limit) as usize) < cards.len(),
            message: None,
        })
    }

    async fn product_detail(&self, id: &str) -> ApiResult<String> {
        self.record(endpoints::PRODUCT_DETAIL, Some(&id))?;
        self.inner
            .borrow()
            .details
            .get(id)
            .cloned()
            .ok_or(ApiError::Status { status: 404, message: None })
    }

    async fn submit_form(&self, form: &FormPost) -> ApiResult<SubmitResponse> {
        let fields: HashMap<&str, &str> = form
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.record(&form.action, Some(&fields))?;
        Ok(SubmitResponse {
            success: true,
            message: None,
        })
    }
}

/// Parse a normalized price ("1234.50", "10", "3.999") into whole cents,
/// truncating extra fraction digits. Unparsable input is zero.
pub fn parse_price_cents(raw: &str) -> i64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let (whole, frac) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), ""));
    let Ok(whole) = whole.parse::<i64>() else {
        return 0;
    };
    let frac: String = frac.chars().chain("00".chars()).take(2).collect();
    let Ok(frac) = frac.parse::<i64>() else {
        return 0;
    };
    whole * 100 + frac
}

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(id: i64, price: &str, quantity: u32) -> AddCartItemRequest {
        AddCartItemRequest {
            product_id: ProductId::Number(id),
            title: format!("Product {id}"),
            sku: String::new(),
            price: price.to_owned(),
            quantity,
        }
    }

    #[test]
    fn cents_roundtrip() {
        assert_eq!(parse_price_cents("1234.50"), 123_450);
        assert_eq!(parse_price_cents("10"), 1_000);
        assert_eq!(parse_price_cents("3.999"), 399);
        assert_eq!(parse_price_cents("abc"), 0);
        assert_eq!(format_cents(123_450), "1234.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-5), "-0.05");
        assert_eq!(format_cents(-12_345), "-123.45");
    }

    #[tokio::test]
    async fn product_detail_fragment_or_not_found() -> anyhow::Result<()> {
        let api = InMemoryStorefront::new().with_product_detail("42", "<div>Widget</div>");
        assert_eq!(api.product_detail("42").await?, "<div>Widget</div>");
        assert_eq!(
            api.product_detail("nope").await,
            Err(ApiError::Status { status: 404, message: None })
        );
        assert_eq!(api.calls_to(endpoints::PRODUCT_DETAIL).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn quantities_accumulate_and_clamp() -> anyhow::Result<()> {
        let api = InMemoryStorefront::new();
        api.add_cart_item(&add(1, "10.00", 2)).await?;
        let cart = api.add_cart_item(&add(1, "10.00", 3)).await?;
        assert_eq!(cart.total_quantity, 5);
        assert_eq!(cart.total_amount, "50.00");

        let cart = api.add_cart_item(&add(1, "10.00", 999)).await?;
        assert_eq!(cart.items[0].quantity, 999);
        Ok(())
    }

    #[tokio::test]
    async fn scripted_failure_consumes_once() -> anyhow::Result<()> {
        let api = InMemoryStorefront::new();
        api.fail_next(ApiError::Network("offline".into()));
        assert!(api.get_cart().await.is_err());
        assert!(api.get_cart().await.is_ok());
        assert_eq!(api.calls_to(endpoints::CART).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn order_empties_cart() -> anyhow::Result<()> {
        let api = InMemoryStorefront::new();
        let order = OrderRequest {
            name: "Анна".into(),
            phone: "+7 700 000 00 00".into(),
            email: String::new(),
            comment: String::new(),
        };
        assert!(api.submit_order(&order).await.is_err());

        api.add_cart_item(&add(3, "1.50", 1)).await?;
        let resp = api.submit_order(&order).await?;
        assert!(resp.success);
        assert!(api.get_cart().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn section_pages() -> anyhow::Result<()> {
        let cards = (0..12).map(|i| format!("<div>{i}</div>")).collect();
        let api = InMemoryStorefront::new().with_section(5, cards);
        let page = api
            .section_products(SectionProductsQuery { section_id: 5, offset: 9, limit: 9 })
            .await?;
        assert_eq!(page.html, "<div>9</div><div>10</div><div>11</div>");
        assert!(!page.has_more);
        Ok(())
    }
}
