//! Category listing extraction shared by all sites.

use scraper::{ElementRef, Selector};
use serde_json::Value;

use pricewatch_core::ProductSnapshot;

use super::SiteProfile;
use crate::extract::{selector, ParsedPage};
use crate::normalize::{decimal_from_json, normalize_price};

pub(super) fn extract_category(
    page: &ParsedPage,
    profile: &SiteProfile,
    limit: usize,
) -> Vec<ProductSnapshot> {
    let layout = &profile.category;
    let item_sel = selector(layout.item);
    let price_sel = selector(layout.price);
    let link_sel = layout.link.map(selector);
    let title_sel = layout.title.map(selector);

    let mut items = Vec::new();
    let mut skipped = 0usize;
    for card in page.document().select(&item_sel) {
        if items.len() >= limit {
            break;
        }
        match card_snapshot(card, profile, &price_sel, link_sel.as_ref(), title_sel.as_ref()) {
            Some(snapshot) => items.push(snapshot),
            None => skipped += 1,
        }
    }

    tracing::debug!(
        site = profile.name,
        url = page.url(),
        found = items.len(),
        skipped,
        "category page extracted"
    );
    items
}

fn card_snapshot(
    card: ElementRef<'_>,
    profile: &SiteProfile,
    price_sel: &Selector,
    link_sel: Option<&Selector>,
    title_sel: Option<&Selector>,
) -> Option<ProductSnapshot> {
    let blob = profile
        .category
        .json_attr
        .and_then(|attr| card.value().attr(attr))
        .filter(|raw| raw.trim_start().starts_with('{'))
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok());

    let price = blob
        .as_ref()
        .and_then(|b| {
            ["price", "priceValue"]
                .iter()
                .find_map(|k| b.get(*k).and_then(|v| decimal_from_json(v).ok()))
        })
        .or_else(|| {
            card.select(price_sel)
                .next()
                .and_then(|node| normalize_price(&node.text().collect::<String>()).ok())
        })
        .filter(|p| !p.is_zero())?;

    let link = match link_sel {
        Some(sel) => card.select(sel).next()?,
        None => card,
    };
    let href = link
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())?;

    let title = title_sel
        .and_then(|sel| card.select(sel).next())
        .map(|node| node.text().collect::<String>())
        .or_else(|| {
            blob.as_ref()
                .and_then(|b| b.get("name").or_else(|| b.get("title")))
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .or_else(|| Some(link.text().collect::<String>()))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "));

    let snapshot = ProductSnapshot::new(profile.absolute_url(href), price, profile.currency)
        .ok()?
        .with_title(title);
    Some(snapshot)
}

#[cfg(test)]
mod tests {
    use crate::fetch::FetchedPage;
    use crate::sites::SiteAdapter;
    use rust_decimal::Decimal;

    fn extract(adapter: SiteAdapter, html: &str, limit: usize) -> Vec<pricewatch_core::ProductSnapshot> {
        let page = adapter.parse(&FetchedPage::new(adapter.profile().base_url, html));
        adapter.extract_category(&page, limit)
    }

    #[test]
    fn petrovich_cards_are_links() {
        let html = r#"
            <a class="catalogCard" href="/product/101">
                <span class="catalogCard-title">Гипсокартон  Кнауф</span>
                <span class="catalogCard-price">489 ₽</span>
            </a>
            <a class="catalogCard" href="/product/102"><span class="catalogCard-title">Без цены</span></a>
        "#;
        let items = extract(SiteAdapter::Petrovich, html, 200);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url(), "https://moscow.petrovich.ru/product/101");
        assert_eq!(items[0].price(), Decimal::from(489));
        assert_eq!(items[0].title(), Some("Гипсокартон Кнауф"));
    }

    #[test]
    fn whitehills_title_falls_back_to_link_text() {
        let html = r#"
            <div class="collection__item">
                <a href="https://whitehills.ru/catalog/plita">Плита ОСБ-3</a>
                <div class="price">1 150 ₽</div>
            </div>
            <div class="products-list__item"><div class="price">900</div></div>
        "#;
        let items = extract(SiteAdapter::WhiteHills, html, 200);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url(), "https://whitehills.ru/catalog/plita");
        assert_eq!(items[0].title(), Some("Плита ОСБ-3"));
    }

    #[test]
    fn mk4s_reads_json_attribute_first() {
        let html = r#"
            <div data-product='{"price": 2750, "name": "Клей"}'>
                <a href="/p/klei">Клей монтажный</a>
                <span class="price">9 999</span>
            </div>
            <div data-product="42"><a href="/p/2">Герметик</a><span class="product-card__price">350 ₽</span></div>
        "#;
        let items = extract(SiteAdapter::Mk4s, html, 200);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].price(), Decimal::from(2750));
        assert_eq!(items[0].url(), "https://mk4s.ru/p/klei");
        assert_eq!(items[1].price(), Decimal::from(350));
    }

    #[test]
    fn limit_caps_the_listing() {
        let card = r#"<a class="catalogCard" href="/p"><span class="catalogCard-price">10</span></a>"#;
        let html = card.repeat(5);
        assert_eq!(extract(SiteAdapter::Petrovich, &html, 3).len(), 3);
    }
}
