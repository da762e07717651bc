//! Product detail modal: `.dev_product_detail[data-id]` links load an HTML
//! fragment into `#dev_modal_product_ajax`.

use crate::dom::{self, Elements};
use crate::state;
use shop_client::StorefrontApi;
use tracing::{debug, error, warn};
use web_sys::Element;

pub const MODAL_ID: &str = "dev_modal_product";

const LOADING_HTML: &str =
    "<div class=\"text-center\" style=\"padding: 40px;\"><i class=\"icon-loading\"></i> Загрузка...</div>";
const ERROR_HTML: &str =
    "<div class=\"callout alert\">Не удалось загрузить информацию о товаре. Попробуйте позже.</div>";

pub async fn on_open(els: &Elements, link: Element) {
    let Some(id) = dom::data(&link, "id") else {
        warn!("product detail link without data-id");
        return;
    };
    let Some(content) = els.product_modal_content.clone() else {
        return;
    };
    let Some(api) = state::api() else {
        return;
    };

    dom::set_inner_html(&content, LOADING_HTML);
    if let Some(modals) = state::modals() {
        modals.remember_scroll(dom::scroll_y());
        if let Err(err) = modals.open(MODAL_ID) {
            warn!(modal = MODAL_ID, "open failed: {}", err);
        }
    }

    match api.product_detail(&id).await {
        Ok(html) => {
            debug!(product = %id, bytes = html.len(), "detail loaded");
            dom::set_inner_html(&content, &html);
        }
        Err(err) => {
            error!(product = %id, "detail failed: {}", err);
            dom::set_inner_html(&content, ERROR_HTML);
        }
    }
}
