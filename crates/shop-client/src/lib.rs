//! Storefront HTTP API seam.
//!
//! `StorefrontApi` is the one place the rest of the workspace touches the
//! network. The browser crate implements it on top of `fetch`; tests and
//! demos use [`memory::InMemoryStorefront`].

pub mod csrf;
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shop_api_types::{
    AddCartItemRequest, ApiStatus, CartSnapshot, LeadRequest, OrderRequest,
    RemoveCartItemRequest, SectionProductsQuery, SectionProductsResponse, SubmitResponse,
};
use thiserror::Error;

pub mod endpoints {
    pub const LEADS: &str = "/api/leads/";
    pub const CART: &str = "/api/cart/";
    pub const CART_ITEMS: &str = "/api/cart/items/";
    pub const CART_ITEMS_REMOVE: &str = "/api/cart/items/remove/";
    pub const CART_CLEAR: &str = "/api/cart/clear/";
    pub const ORDERS: &str = "/api/orders/";
    pub const SECTION_PRODUCTS: &str = "/api/section/products/";
    pub const PRODUCT_DETAIL: &str = "/api/product/detail/";
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },
    #[error("request rejected{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Application { message: Option<String> },
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Server-provided text suitable for showing to a shopper, if any.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::Application { message } => message.as_deref(),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A url-encoded form post (callback, feedback and consultation forms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPost {
    pub action: String,
    pub fields: Vec<(String, String)>,
    pub csrf_token: String,
}

#[async_trait(?Send)]
pub trait StorefrontApi {
    async fn get_cart(&self) -> ApiResult<CartSnapshot>;
    async fn add_cart_item(&self, req: &AddCartItemRequest) -> ApiResult<CartSnapshot>;
    async fn remove_cart_item(&self, req: &RemoveCartItemRequest) -> ApiResult<CartSnapshot>;
    async fn clear_cart(&self) -> ApiResult<CartSnapshot>;
    async fn submit_lead(&self, req: &LeadRequest) -> ApiResult<SubmitResponse>;
    async fn submit_order(&self, req: &OrderRequest) -> ApiResult<SubmitResponse>;
    async fn section_products(&self, query: SectionProductsQuery) -> ApiResult<SectionProductsResponse>;
    async fn product_detail(&self, id: &str) -> ApiResult<String>;
    async fn submit_form(&self, form: &FormPost) -> ApiResult<SubmitResponse>;
}

/// Decode a JSON response body into `T`, mapping the backend's failure
/// conventions onto [`ApiError`]:
/// non-2xx → `Status`, `"success": false` → `Application`.
pub fn decode_json<T: DeserializeOwned>(status: u16, body: &str) -> ApiResult<T> {
    let envelope = serde_json::from_str::<ApiStatus>(body).ok();

    if !(200..300).contains(&status) {
        return Err(ApiError::Status {
            status,
            message: envelope.as_ref().and_then(|e| e.user_message()).map(str::to_owned),
        });
    }

    if let Some(env) = envelope.as_ref().filter(|e| e.is_failure()) {
        return Err(ApiError::Application {
            message: env.user_message().map(str::to_owned),
        });
    }

    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Decode a plain-text body (HTML fragments); only the status is checked.
pub fn decode_text(status: u16, body: String) -> ApiResult<String> {
    if !(200..300).contains(&status) {
        return Err(ApiError::Status { status, message: None });
    }
    Ok(body)
}

/// Build a query string from key/value pairs.
pub fn query_string(pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                k,
                percent_encoding::utf8_percent_encode(v, percent_encoding::NON_ALPHANUMERIC)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// `application/x-www-form-urlencoded` body for a [`FormPost`].
pub fn form_body(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                percent_encoding::utf8_percent_encode(k, percent_encoding::NON_ALPHANUMERIC),
                percent_encoding::utf8_percent_encode(v, percent_encoding::NON_ALPHANUMERIC)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
