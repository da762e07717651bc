//! Page-level tunables.
//!
//! Defaults match the storefront templates. The browser crate may override
//! any subset from a JSON blob on `<body data-storefront-config>`.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Prefix prepended to every `/api/...` path. Empty means same origin.
    pub api_base: String,
    /// Products shown when a section opens, and the load-more page size.
    pub section_page_size: u32,
    /// Products revealed per "show more" click in the category grid.
    pub grid_batch_size: usize,
    pub max_open_depth: usize,
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub modal_auto_close_ms: u32,
    pub restore_delay_ms: u32,
    pub scroll_offset_px: i32,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            section_page_size: 9,
            grid_batch_size: 24,
            max_open_depth: 10,
            min_quantity: 1,
            max_quantity: 999,
            modal_auto_close_ms: 1500,
            restore_delay_ms: 100,
            scroll_offset_px: 60,
        }
    }
}

impl StorefrontConfig {
    /// Parse overrides, keeping defaults for anything missing. A malformed
    /// blob is logged and ignored.
    pub fn from_json(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Self>(raw) {
            Ok(mut cfg) => {
                if cfg.min_quantity == 0 || cfg.min_quantity > cfg.max_quantity {
                    warn!(
                        min = cfg.min_quantity,
                        max = cfg.max_quantity,
                        "invalid quantity bounds, using defaults"
                    );
                    let defaults = Self::default();
                    cfg.min_quantity = defaults.min_quantity;
                    cfg.max_quantity = defaults.max_quantity;
                }
                cfg.api_base = cfg.api_base.trim_end_matches('/').to_owned();
                cfg
            }
            Err(err) => {
                warn!("ignoring storefront config: {}", err);
                Self::default()
            }
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let cfg = StorefrontConfig::from_json(r#"{"api_base": "https://shop.example/", "section_page_size": 12}"#);
        assert_eq!(cfg.api_base, "https://shop.example");
        assert_eq!(cfg.section_page_size, 12);
        assert_eq!(cfg.max_quantity, 999);
        assert_eq!(cfg.url("/api/cart/"), "https://shop.example/api/cart/");
    }

    #[test]
    fn default_base_keeps_requests_same_origin() {
        assert_eq!(StorefrontConfig::default().url("/api/cart/"), "/api/cart/");
    }

    #[test]
    fn malformed_or_inconsistent_input_falls_back() {
        assert_eq!(StorefrontConfig::from_json("{not json"), StorefrontConfig::default());
        let cfg = StorefrontConfig::from_json(r#"{"min_quantity": 50, "max_quantity": 10}"#);
        assert_eq!((cfg.min_quantity, cfg.max_quantity), (1, 999));
    }
}
