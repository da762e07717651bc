//! CSRF token lookup.
//!
//! Mutating requests echo the `csrftoken` cookie in `X-CSRFToken`. The most
//! recent token read from the cookie is remembered so a later request still
//! carries it if the cookie has been dropped in the meantime.

use std::cell::RefCell;

pub const COOKIE_NAME: &str = "csrftoken";
pub const HEADER_NAME: &str = "X-CSRFToken";

/// Extract and percent-decode a cookie value from a `document.cookie` string.
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .map(str::trim_start)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .filter(|v| !v.is_empty())
        .map(|v| percent_encoding::percent_decode_str(v).decode_utf8_lossy().into_owned())
}

#[derive(Debug, Default)]
pub struct CsrfTokenCache {
    last_seen: RefCell<Option<String>>,
}

impl CsrfTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token: the live cookie if present (which also replaces the
    /// cached one), otherwise the last token seen, otherwise an empty string.
    pub fn token(&self, cookies: &str) -> String {
        match cookie_value(cookies, COOKIE_NAME) {
            Some(token) => {
                *self.last_seen.borrow_mut() = Some(token.clone());
                token
            }
            None => self.last_seen.borrow().clone().unwrap_or_default(),
        }
    }
}
