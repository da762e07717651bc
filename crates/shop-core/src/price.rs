//! Price and quantity normalization.
//!
//! Prices arrive as locale strings scraped from markup ("1 234,50",
//! "1\u{a0}234,50 тг") and leave as plain decimal strings for the API.
//! Display formatting follows ru-RU conventions.

const NBSP: char = '\u{a0}';

/// Strip whitespace (including no-break spaces) and turn the first decimal
/// comma into a dot. Empty input becomes `"0"`.
pub fn normalize_price(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.is_empty() {
        return "0".to_owned();
    }
    stripped.replacen(',', ".", 1)
}

/// Keep only digits and separators, as scraped price labels carry currency
/// suffixes and labels.
pub fn price_from_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect()
}

/// Parse the leading decimal number of a normalized price, like `parseFloat`.
fn parse_leading_float(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '-' | '+' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    s.get(..end)?.parse().ok()
}

/// ru-RU display: thousands grouped with no-break spaces, decimal comma, at
/// most three fraction digits with trailing zeros dropped.
pub fn format_price(raw: &str) -> String {
    let value = parse_leading_float(&normalize_price(raw)).unwrap_or(0.0);
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(NBSP);
        }
        grouped.push(c);
    }

    let negative = value < 0.0 && (int_part != "0" || !frac_part.is_empty());
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push(',');
        out.push_str(frac_part);
    }
    out
}

/// `parseInt` semantics: optional sign and leading digits, rest ignored.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    if end == 0 {
        return None;
    }
    digits[..end]
        .parse::<i64>()
        .ok()
        .map(|n| n * sign)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for QuantityBounds {
    fn default() -> Self {
        Self { min: 1, max: 999 }
    }
}

impl QuantityBounds {
    pub fn clamp(&self, value: i64) -> u32 {
        value.clamp(i64::from(self.min), i64::from(self.max)) as u32
    }

    /// Clamp a typed value; anything unparsable becomes the minimum.
    pub fn clamp_input(&self, raw: &str) -> u32 {
        self.clamp(parse_int_prefix(raw).unwrap_or(i64::from(self.min)))
    }

    /// Step a quantity input by `delta`, treating unparsable or zero
    /// values as the minimum first.
    pub fn step(&self, raw: &str, delta: i64) -> u32 {
        let current = parse_int_prefix(raw)
            .filter(|n| *n != 0)
            .unwrap_or(i64::from(self.min));
        self.clamp(current.saturating_add(delta))
    }

    /// Quantity for an add-to-cart click: the product's input if positive,
    /// else the button's `data-quantity` if positive, else the minimum.
    pub fn for_add(&self, input: Option<&str>, button_default: Option<&str>) -> u32 {
        let positive = |raw: Option<&str>| raw.and_then(parse_int_prefix).filter(|n| *n > 0);
        let value = positive(input)
            .or_else(|| positive(button_default))
            .unwrap_or(i64::from(self.min));
        self.clamp(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_locale_prices() {
        assert_eq!(normalize_price("1 234,50"), "1234.50");
        assert_eq!(normalize_price("1\u{a0}234,50"), "1234.50");
        assert_eq!(normalize_price("99.90"), "99.90");
        assert_eq!(normalize_price("  "), "0");
        assert_eq!(price_from_label("Цена: 12 500,00 тг"), "12500,00");
    }

    #[test]
    fn formats_like_ru_locale() {
        assert_eq!(format_price("1234.50"), "1\u{a0}234,5");
        assert_eq!(format_price("20.00"), "20");
        assert_eq!(format_price("1234567"), "1\u{a0}234\u{a0}567");
        assert_eq!(format_price("999"), "999");
        assert_eq!(format_price("0.125"), "0,125");
        assert_eq!(format_price("garbage"), "0");
        assert_eq!(format_price("1 234,50"), "1\u{a0}234,5");
    }

    #[test]
    fn quantity_is_always_in_bounds() {
        let b = QuantityBounds::default();
        assert_eq!(b.clamp_input("0"), 1);
        assert_eq!(b.clamp_input("5000"), 999);
        assert_eq!(b.clamp_input("-4"), 1);
        assert_eq!(b.clamp_input("abc"), 1);
        assert_eq!(b.clamp_input("12шт"), 12);
    }

    #[test]
    fn stepping_respects_bounds() {
        let b = QuantityBounds::default();
        assert_eq!(b.step("1", -1), 1);
        assert_eq!(b.step("999", 1), 999);
        assert_eq!(b.step("", 1), 2);
        assert_eq!(b.step("7", -1), 6);
    }

    #[test]
    fn add_quantity_falls_back_to_button_then_minimum() {
        let b = QuantityBounds::default();
        assert_eq!(b.for_add(Some("3"), Some("5")), 3);
        assert_eq!(b.for_add(Some("0"), Some("5")), 5);
        assert_eq!(b.for_add(None, None), 1);
        assert_eq!(b.for_add(Some("5000"), None), 999);
    }
}
