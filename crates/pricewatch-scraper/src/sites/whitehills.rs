//! whitehills.ru

use super::{CategoryProfile, SiteProfile};

pub(super) static PROFILE: SiteProfile = SiteProfile {
    name: "whitehills",
    base_url: "https://whitehills.ru",
    currency: "RUB",
    price_selectors: &[
        ".product-card__price-current span",
        ".price__current",
        ".values_wrapper .price_value",
    ],
    title_selectors: &["h1", ".product-card__title"],
    script_markers: &["offers"],
    product_json_keys: &["product", "item"],
    sku_keys: &["sku", "article"],
    variant_json_keys: &["variants", "offers"],
    category: CategoryProfile {
        item: ".collection__item, .products-list__item",
        link: Some("a"),
        price: ".price, .product__price",
        title: None,
        json_attr: None,
    },
};

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    use crate::disambiguate::SelectionPolicy;
    use crate::fetch::FetchedPage;
    use crate::sites::SiteAdapter;

    const ADAPTER: SiteAdapter = SiteAdapter::WhiteHills;

    #[test]
    fn jsonld_price() {
        let html = r#"<script type="application/ld+json">{"@type":"Product","offers":{"price":"1790"}}</script>"#;
        assert_eq!(ADAPTER.parse_price(html), Some(Decimal::from(1790)));
    }

    #[test]
    fn meta_price() {
        let html = "<meta itemprop='price' content='1 790,50'>";
        assert_eq!(ADAPTER.parse_price(html), Some(Decimal::from_str("1790.50").unwrap()));
    }

    #[test]
    fn price_value_with_non_breaking_space() {
        let html = "<span class=\"values_wrapper\"><span class=\"price_value\">2\u{00A0}200</span></span>";
        assert_eq!(ADAPTER.parse_price(html), Some(Decimal::from(2200)));
    }

    #[test]
    fn current_price_span() {
        let html = r#"
            <html><body>
                <div class="product-card__price-current"><span>2 500 ₽</span></div>
            </body></html>
        "#;
        let page = ADAPTER.parse(&FetchedPage::new("https://whitehills.ru/p/sku-1", html));
        let snapshot = ADAPTER
            .extract_product(&page, None, &SelectionPolicy::new(false, "RUB"))
            .unwrap();
        assert_eq!(snapshot.price(), Decimal::from(2500));
    }

    #[test]
    fn offers_list_selects_variant_by_sku() {
        let html = r#"<script>var data = {"product": {"name": "Краска", "offers": [
            {"name": "0.9 л", "sku": "WH-09", "price": 690},
            {"name": "2.7 л", "sku": "WH-27", "price": 1890}
        ]}};</script>"#;
        let page = ADAPTER.parse(&FetchedPage::new("https://whitehills.ru/p/paint", html));
        let snapshot = ADAPTER
            .extract_product(&page, Some("WH-27"), &SelectionPolicy::new(false, "RUB"))
            .unwrap();
        assert_eq!(snapshot.price(), Decimal::from(1890));
        assert_eq!(snapshot.sku(), Some("WH-27"));
        assert_eq!(snapshot.variant_key(), Some("WH-27"));
        assert_eq!(snapshot.title(), Some("Краска"));

        let default = ADAPTER
            .extract_product(&page, None, &SelectionPolicy::new(false, "RUB"))
            .unwrap();
        assert_eq!(default.price(), Decimal::from(690));
        assert_eq!(default.variant_key(), Some("0.9 л"));
    }
}
