//! mk4s.ru

use super::{CategoryProfile, SiteProfile};

pub(super) static PROFILE: SiteProfile = SiteProfile {
    name: "mk4s",
    base_url: "https://mk4s.ru",
    currency: "RUB",
    price_selectors: &["[data-product-price]", ".price--current", ".product-price"],
    title_selectors: &["h1", ".product__title"],
    script_markers: &["variants", "sku"],
    product_json_keys: &["product"],
    sku_keys: &["sku", "id"],
    variant_json_keys: &["variants", "offers", "items"],
    category: CategoryProfile {
        item: "[data-product]",
        link: Some("a"),
        price: ".price, .product-card__price",
        title: None,
        json_attr: Some("data-product"),
    },
};
