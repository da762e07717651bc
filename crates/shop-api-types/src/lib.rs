use serde::{Deserialize, Serialize};
use std::fmt;

/// Product identifier as the backend emits it: numeric for catalog products,
/// free-form text for anything keyed by SKU.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ProductId {
    Number(i64),
    Text(String),
}

impl ProductId {
    /// Parse a data-attribute value the way the page scripts read them:
    /// integral strings become numbers, anything else stays text.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<i64>() {
            Ok(0) => None,
            Ok(n) => Some(Self::Number(n)),
            Err(_) => Some(Self::Text(raw.to_owned())),
        }
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub price: Option<String>,
    pub quantity: u32,
    pub subtotal: String,
}

/// Server-authoritative cart state, returned by every cart endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_quantity: u32,
    #[serde(default = "zero_amount")]
    pub total_amount: String,
}

fn zero_amount() -> String {
    "0.00".to_owned()
}

impl CartSnapshot {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_quantity: 0,
            total_amount: zero_amount(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_quantity == 0
    }
}

impl Default for CartSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Envelope fields the backend mixes into JSON bodies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiStatus {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiStatus {
    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }

    /// Message to show a user, preferring `message` over `error`. Blank
    /// fields are skipped.
    pub fn user_message(&self) -> Option<&str> {
        fn nonblank(m: &Option<String>) -> Option<&str> {
            m.as_deref().filter(|m| !m.trim().is_empty())
        }
        nonblank(&self.message).or_else(|| nonblank(&self.error))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddCartItemRequest {
    pub product_id: ProductId,
    pub title: String,
    pub sku: String,
    pub price: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveCartItemRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeadRequest {
    pub lead_type: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub comment: String,
}

/// `{success, message}` acknowledgement for leads, orders and callback forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionProductsQuery {
    pub section_id: u64,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionProductsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_parses_like_data_attributes() {
        assert_eq!(ProductId::parse("42"), Some(ProductId::Number(42)));
        assert_eq!(ProductId::parse(" AB-7 "), Some(ProductId::Text("AB-7".into())));
        assert_eq!(ProductId::parse(""), None);
        assert_eq!(ProductId::parse("0"), None);
    }

    #[test]
    fn snapshot_accepts_success_envelope_and_mixed_ids() {
        let body = r#"{
            "success": true,
            "items": [
                {"product_id": 42, "title": "Widget", "sku": "W-1", "price": "10.00", "quantity": 2, "subtotal": "20.00"},
                {"product_id": "X9", "title": "Gadget", "sku": "", "quantity": 1, "subtotal": "5.50"}
            ],
            "total_quantity": 3,
            "total_amount": "25.50"
        }"#;
        let cart: CartSnapshot = serde_json::from_str(body).unwrap();
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].product_id, ProductId::Number(42));
        assert_eq!(cart.items[1].product_id, ProductId::Text("X9".into()));
        assert_eq!(cart.total_amount, "25.50");
    }

    #[test]
    fn add_request_serializes_numeric_id() {
        let req = AddCartItemRequest {
            product_id: ProductId::Number(42),
            title: "Widget".into(),
            sku: String::new(),
            price: "1234.50".into(),
            quantity: 2,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["product_id"], 42);
        assert_eq!(value["price"], "1234.50");
        assert_eq!(value["quantity"], 2);
    }

    #[test]
    fn status_prefers_message_over_error() {
        let status: ApiStatus =
            serde_json::from_str(r#"{"success": false, "error": "e", "message": "m"}"#).unwrap();
        assert!(status.is_failure());
        assert_eq!(status.user_message(), Some("m"));

        let status: ApiStatus = serde_json::from_str(r#"{"error": "only"}"#).unwrap();
        assert_eq!(status.user_message(), Some("only"));
    }

    #[test]
    fn blank_message_yields_to_error() {
        let status: ApiStatus =
            serde_json::from_str(r#"{"success": false, "message": "", "error": "Bad"}"#).unwrap();
        assert_eq!(status.user_message(), Some("Bad"));

        let status: ApiStatus = serde_json::from_str(r#"{"message": " ", "error": ""}"#).unwrap();
        assert_eq!(status.user_message(), None);
    }
}
