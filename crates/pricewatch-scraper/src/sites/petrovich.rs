//! moscow.petrovich.ru

use super::{CategoryProfile, SiteProfile};

pub(super) static PROFILE: SiteProfile = SiteProfile {
    name: "petrovich",
    base_url: "https://moscow.petrovich.ru",
    currency: "RUB",
    price_selectors: &[
        "[data-test='product-card-price'] span",
        ".product-price__current",
    ],
    title_selectors: &["h1", "[data-test='product-title']"],
    script_markers: &["productCard", "currentPrice"],
    product_json_keys: &["product", "productCard"],
    sku_keys: &["sku", "code"],
    variant_json_keys: &["variants"],
    category: CategoryProfile {
        item: "a.catalogCard",
        link: None,
        price: ".catalogCard-price",
        title: Some(".catalogCard-title"),
        json_attr: None,
    },
};
