//! Stage 2: `<meta>` tags carrying a price.

use scraper::Html;

use super::selector;
use crate::candidate::{PriceCandidate, Strategy};
use crate::normalize::normalize_price;

const PRICE_METAS: &[&str] = &[
    "meta[itemprop='price']",
    "meta[property='product:price:amount']",
    "meta[property='og:price:amount']",
    "meta[name='price']",
];

const CURRENCY_METAS: &[&str] = &[
    "meta[itemprop='priceCurrency']",
    "meta[property='product:price:currency']",
    "meta[property='og:price:currency']",
];

pub(super) fn meta_candidates(document: &Html) -> Vec<PriceCandidate> {
    let currency = page_currency(document);
    let mut out = Vec::new();
    for css in PRICE_METAS {
        for node in document.select(&selector(css)) {
            let Some(content) = node.value().attr("content") else {
                continue;
            };
            let Ok(value) = normalize_price(content) else {
                continue;
            };
            out.push(
                PriceCandidate::new(value, Strategy::MetaTag, *css, content.trim())
                    .with_currency(currency.clone()),
            );
        }
    }
    out
}

fn page_currency(document: &Html) -> Option<String> {
    CURRENCY_METAS.iter().find_map(|css| {
        document
            .select(&selector(css))
            .find_map(|node| node.value().attr("content"))
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
    })
}
