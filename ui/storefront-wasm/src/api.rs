//! HTTP API client.
//!
//! `fetch`-backed [`StorefrontApi`] over `gloo-net`. Requests are
//! same-origin with credentials; mutating calls carry the CSRF token.

use crate::dom;
use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shop_api_types::{
    AddCartItemRequest, CartSnapshot, LeadRequest, OrderRequest, RemoveCartItemRequest,
    SectionProductsQuery, SectionProductsResponse, SubmitResponse,
};
use shop_client::csrf::{CsrfTokenCache, HEADER_NAME};
use shop_client::{
    decode_json, decode_text, endpoints, form_body, query_string, ApiError, ApiResult, FormPost,
    StorefrontApi,
};
use shop_core::StorefrontConfig;
use tracing::debug;
use web_sys::RequestCredentials;

pub struct FetchApi {
    config: StorefrontConfig,
    csrf: CsrfTokenCache,
}

impl FetchApi {
    pub fn new(config: &StorefrontConfig) -> Self {
        Self {
            config: config.clone(),
            csrf: CsrfTokenCache::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    /// Current CSRF token, also used to prefill lead forms.
    pub fn csrf_token(&self) -> String {
        self.csrf.token(&dom::cookies())
    }

    fn get(&self, path: &str) -> RequestBuilder {
        Request::get(&self.url(path)).credentials(RequestCredentials::SameOrigin)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        Request::post(&self.url(path))
            .credentials(RequestCredentials::SameOrigin)
            .header(HEADER_NAME, &self.csrf_token())
    }

    async fn read(resp: Response) -> ApiResult<(u16, String)> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok((status, body))
    }

    async fn send(request: Result<Request, gloo_net::Error>) -> ApiResult<(u16, String)> {
        let request = request.map_err(|e| ApiError::Decode(e.to_string()))?;
        debug!(method = ?request.method(), url = %request.url(), "fetch");
        let resp = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read(resp).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let (status, body) = Self::send(self.get(path).build()).await?;
        decode_json(status, &body)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let (status, text) = Self::send(self.post(path).json(body)).await?;
        decode_json(status, &text)
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let (status, text) = Self::send(self.post(path).build()).await?;
        decode_json(status, &text)
    }
}

#[async_trait(?Send)]
impl StorefrontApi for FetchApi {
    async fn get_cart(&self) -> ApiResult<CartSnapshot> {
        self.get_json(endpoints::CART).await
    }

    async fn add_cart_item(&self, req: &AddCartItemRequest) -> ApiResult<CartSnapshot> {
        self.post_json(endpoints::CART_ITEMS, req).await
    }

    async fn remove_cart_item(&self, req: &RemoveCartItemRequest) -> ApiResult<CartSnapshot> {
        self.post_json(endpoints::CART_ITEMS_REMOVE, req).await
    }

    async fn clear_cart(&self) -> ApiResult<CartSnapshot> {
        self.post_empty(endpoints::CART_CLEAR).await
    }

    async fn submit_lead(&self, req: &LeadRequest) -> ApiResult<SubmitResponse> {
        self.post_json(endpoints::LEADS, req).await
    }

    async fn submit_order(&self, req: &OrderRequest) -> ApiResult<SubmitResponse> {
        self.post_json(endpoints::ORDERS, req).await
    }

    async fn section_products(&self, query: SectionProductsQuery) -> ApiResult<SectionProductsResponse> {
        let qs = query_string(&[
            ("section_id", query.section_id.to_string()),
            ("offset", query.offset.to_string()),
            ("limit", query.limit.to_string()),
        ]);
        self.get_json(&format!("{}?{}", endpoints::SECTION_PRODUCTS, qs)).await
    }

    async fn product_detail(&self, id: &str) -> ApiResult<String> {
        let qs = query_string(&[("id", id.to_owned())]);
        let (status, body) =
            Self::send(self.get(&format!("{}?{}", endpoints::PRODUCT_DETAIL, qs)).build()).await?;
        decode_text(status, body)
    }

    async fn submit_form(&self, form: &FormPost) -> ApiResult<SubmitResponse> {
        let request = Request::post(&form.action)
            .credentials(RequestCredentials::SameOrigin)
            .header(HEADER_NAME, &form.csrf_token)
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")
            .body(form_body(&form.fields));
        let (status, body) = Self::send(request).await?;
        decode_json(status, &body)
    }
}
