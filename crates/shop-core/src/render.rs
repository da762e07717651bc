//! Cart markup.
//!
//! The cart modal body is regenerated from the snapshot on every change.
//! Server-supplied strings are escaped before they reach `innerHTML`.

use crate::price::format_price;
use shop_api_types::{CartItem, CartSnapshot};
use std::fmt::Write;

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Header counter values: item count and formatted total.
pub fn counters(cart: &CartSnapshot) -> (String, String) {
    (cart.total_quantity.to_string(), format_price(&cart.total_amount))
}

const ORDER_FORM: &str = concat!(
    r#"<form class="cart-order-form" data-role="order-form">"#,
    r#"<div class="cart-order-form__title">Оформление заказа</div>"#,
    r#"<div class="input-box"><i class="icon-fio"></i>"#,
    r#"<input type="text" name="name" class="input-box__input" required autocomplete="off" placeholder="ФИО"></div>"#,
    r#"<div class="input-box"><i class="icon-phone-border"></i>"#,
    r#"<input type="text" name="phone" class="input-box__input is-phone" required autocomplete="off" placeholder="Телефон"></div>"#,
    r#"<div class="input-box"><i class="icon-email"></i>"#,
    r#"<input type="email" name="email" class="input-box__input" autocomplete="off" placeholder="E-mail (по желанию)"></div>"#,
    r#"<div class="input-box">"#,
    r#"<textarea name="comment" class="input-box__input cart-order-form__comment" rows="3" placeholder="Комментарий к заказу"></textarea></div>"#,
    r#"<div class="form-box__button">"#,
    r#"<button class="button" type="submit"><i class="icon-hand"></i><span>Оформить заказ</span></button></div>"#,
    r#"<div class="form-box__message" data-role="form-message"></div>"#,
    "</form>",
);

fn render_item(out: &mut String, item: &CartItem) {
    let id = escape_html(&item.product_id.to_string());
    let _ = write!(
        out,
        r#"<div class="cart-item" data-product-id="{id}"><div class="cart-item__info"><div class="cart-item__title">{}</div>"#,
        escape_html(&item.title)
    );
    if !item.sku.is_empty() {
        let _ = write!(out, r#"<div class="cart-item__sku">Маркировка: {}</div>"#, escape_html(&item.sku));
    }
    let _ = write!(
        out,
        concat!(
            r#"</div><div class="cart-item__qty">{} шт.</div>"#,
            r#"<div class="cart-item__price">{} тг</div>"#,
            r#"<button type="button" class="cart-item__remove button-plain" data-action="remove" data-product-id="{}">Удалить</button></div>"#,
        ),
        item.quantity,
        format_price(&item.subtotal),
        id
    );
}

pub fn cart_modal(cart: &CartSnapshot) -> String {
    if cart.items.is_empty() {
        return concat!(
            r#"<div class="box-modal__title"><i class="icon-basket"></i>Корзина пуста</div>"#,
            r#"<p class="cart-empty-text">Добавьте товары из каталога, чтобы оформить заказ.</p>"#,
        )
        .to_owned();
    }

    let mut out = String::from(r#"<div class="box-modal__title"><i class="icon-basket"></i>Корзина</div><div class="cart-items">"#);
    for item in &cart.items {
        render_item(&mut out, item);
    }
    let _ = write!(
        out,
        concat!(
            r#"</div><div class="cart-summary">"#,
            r#"<div class="cart-summary__row"><span>Товаров:</span><span>{} шт.</span></div>"#,
            r#"<div class="cart-summary__row cart-summary__row--total"><span>Сумма:</span><span>{} тг</span></div></div>"#,
            r#"<div class="cart-actions"><button type="button" class="button-plain cart-clear-button" data-action="clear-cart">Очистить корзину</button></div>"#,
        ),
        cart.total_quantity,
        format_price(&cart.total_amount)
    );
    out.push_str(ORDER_FORM);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_api_types::ProductId;

    fn item(title: &str, sku: &str) -> CartItem {
        CartItem {
            product_id: ProductId::from(7),
            title: title.into(),
            sku: sku.into(),
            price: Some("617.25".into()),
            quantity: 2,
            subtotal: "1234.50".into(),
        }
    }

    #[test]
    fn empty_cart_has_no_order_form() {
        let html = cart_modal(&CartSnapshot::empty());
        assert!(html.contains("Корзина пуста"));
        assert!(!html.contains("order-form"));
    }

    #[test]
    fn items_are_escaped_and_formatted() {
        let cart = CartSnapshot {
            items: vec![item("<b>Болт</b>", ""), item("Гайка", "M8 \"A\"")],
            total_quantity: 4,
            total_amount: "2469.00".into(),
        };
        let html = cart_modal(&cart);
        assert!(html.contains("&lt;b&gt;Болт&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("Маркировка: M8 &quot;A&quot;"));
        assert_eq!(html.matches("cart-item__sku").count(), 1);
        assert!(html.contains("1\u{a0}234,5 тг"));
        assert!(html.contains("4 шт."));
        assert!(html.contains("2\u{a0}469 тг"));
        assert!(html.contains(r#"data-role="order-form""#));
    }

    #[test]
    fn counters_follow_snapshot() {
        let cart = CartSnapshot {
            items: vec![],
            total_quantity: 3,
            total_amount: "1500.00".into(),
        };
        assert_eq!(counters(&cart), ("3".to_owned(), "1\u{a0}500".to_owned()));
    }
}
