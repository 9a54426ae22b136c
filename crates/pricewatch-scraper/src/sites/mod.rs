//! Site adapters.
//!
//! Each supported competitor is a [`SiteAdapter`] variant backed by a static
//! [`SiteProfile`]: selectors, JSON key names and category card layout. The
//! extraction machinery is shared; only the profile differs per site.

mod category;
mod mk4s;
mod petrovich;
mod whitehills;

use rust_decimal::Decimal;
use serde_json::{json, Value};

use pricewatch_core::ProductSnapshot;

use crate::disambiguate::{select_price, SelectionPolicy};
use crate::error::ScraperError;
use crate::extract::structured::product_nodes;
use crate::extract::{selector, ParsedPage};
use crate::fetch::FetchedPage;
use crate::variants::{collect_variants, select_variant};

const MAX_JSON_DEPTH: usize = 6;

/// Layout of one product card on a category listing.
#[derive(Debug)]
pub struct CategoryProfile {
    /// Selector for each product card.
    pub item: &'static str,
    /// Link inside the card; `None` when the card itself is the `<a>`.
    pub link: Option<&'static str>,
    pub price: &'static str,
    pub title: Option<&'static str>,
    /// Attribute holding a JSON blob with `price` / `priceValue`.
    pub json_attr: Option<&'static str>,
}

/// Everything site-specific about one competitor.
#[derive(Debug)]
pub struct SiteProfile {
    pub name: &'static str,
    pub base_url: &'static str,
    pub currency: &'static str,
    /// "Current price" nodes, most specific first.
    pub price_selectors: &'static [&'static str],
    pub title_selectors: &'static [&'static str],
    /// Extra words that mark an inline script as worth parsing.
    pub script_markers: &'static [&'static str],
    /// Keys under which embedded state stores the product object.
    pub product_json_keys: &'static [&'static str],
    pub sku_keys: &'static [&'static str],
    /// Keys whose value is a map or list of purchasable options.
    pub variant_json_keys: &'static [&'static str],
    pub category: CategoryProfile,
}

impl SiteProfile {
    /// Resolves `href` from a listing against the site root.
    #[must_use]
    pub fn absolute_url(&self, href: &str) -> String {
        let href = href.trim();
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_owned()
        } else if let Some(rest) = href.strip_prefix("//") {
            format!("https://{rest}")
        } else if href.starts_with('/') {
            format!("{}{href}", self.base_url)
        } else {
            format!("{}/{href}", self.base_url)
        }
    }
}

/// Supported competitor sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteAdapter {
    Petrovich,
    WhiteHills,
    Mk4s,
}

/// Adapter lookup by the identifier used in configuration.
const REGISTRY: &[(&str, SiteAdapter)] = &[
    ("petrovich", SiteAdapter::Petrovich),
    ("whitehills", SiteAdapter::WhiteHills),
    ("white_hills", SiteAdapter::WhiteHills),
    ("mk4s", SiteAdapter::Mk4s),
];

impl SiteAdapter {
    pub const ALL: [SiteAdapter; 3] = [SiteAdapter::Petrovich, SiteAdapter::WhiteHills, SiteAdapter::Mk4s];

    /// Looks up an adapter by site identifier, ignoring case and
    /// surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnknownAdapter`] for unregistered names.
    pub fn from_name(name: &str) -> Result<Self, ScraperError> {
        let wanted = name.trim().to_ascii_lowercase();
        REGISTRY
            .iter()
            .find(|(id, _)| *id == wanted)
            .map(|(_, adapter)| *adapter)
            .ok_or_else(|| ScraperError::UnknownAdapter {
                name: name.to_owned(),
            })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.profile().name
    }

    #[must_use]
    pub fn profile(self) -> &'static SiteProfile {
        match self {
            SiteAdapter::Petrovich => &petrovich::PROFILE,
            SiteAdapter::WhiteHills => &whitehills::PROFILE,
            SiteAdapter::Mk4s => &mk4s::PROFILE,
        }
    }

    /// Parses raw content with this site's profile.
    #[must_use]
    pub fn parse(self, page: &FetchedPage) -> ParsedPage {
        ParsedPage::parse(page, self.profile())
    }

    /// Builds a snapshot for one product page.
    ///
    /// When the page exposes variants the requested one (or the first) is
    /// priced and the snapshot's variant key is the key of the option that
    /// was used. A requested variant the page does not offer falls back to
    /// the first option with a warning. Pages without variants ignore the
    /// request and echo it back as the variant key.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::PriceNotFound`] when no plausible price
    /// survives extraction.
    pub fn extract_product(
        self,
        page: &ParsedPage,
        variant: Option<&str>,
        policy: &SelectionPolicy,
    ) -> Result<ProductSnapshot, ScraperError> {
        let profile = self.profile();
        let options = collect_variants(page, profile);

        let (chosen, candidates) = if options.is_empty() {
            (None, page.candidates(profile).collect::<Vec<_>>())
        } else {
            let option = match select_variant(&options, variant) {
                Some(option) => option,
                None => {
                    let available = options
                        .iter()
                        .map(|o| o.key.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    let fallback = &options[0];
                    tracing::warn!(
                        site = self.name(),
                        url = page.url(),
                        requested = variant.unwrap_or_default(),
                        available = %available,
                        using = %fallback.key,
                        "requested variant not offered, pricing the first one"
                    );
                    fallback
                }
            };
            let plausible = option
                .candidates
                .iter()
                .filter(|c| c.is_plausible())
                .cloned()
                .collect::<Vec<_>>();
            (Some(option), plausible)
        };

        let Some(best) = select_price(candidates, policy) else {
            return Err(ScraperError::PriceNotFound {
                url: page.url().to_owned(),
                reason: "no plausible price candidates".to_owned(),
            });
        };
        tracing::debug!(
            site = self.name(),
            url = page.url(),
            price = %best.value,
            strategy = %best.strategy,
            source = %best.source,
            "price selected"
        );

        let currency = best
            .currency
            .clone()
            .unwrap_or_else(|| profile.currency.to_owned());
        let variant_key = chosen
            .map(|o| o.key.clone())
            .or_else(|| variant.map(str::to_owned));
        let sku = chosen
            .and_then(|o| o.sku.clone())
            .or_else(|| product_sku(page, profile));
        let payload = chosen.map(|o| json!({ "variant": o.payload, "source": best.source }));

        let snapshot = ProductSnapshot::new(page.url(), best.value, currency)?
            .with_title(product_title(page, profile))
            .with_sku(sku)
            .with_variant_key(variant_key)
            .with_payload(payload);
        Ok(snapshot)
    }

    /// Best-effort listing extraction: cards without a link or a plausible
    /// price are skipped. At most `limit` items are returned.
    #[must_use]
    pub fn extract_category(self, page: &ParsedPage, limit: usize) -> Vec<ProductSnapshot> {
        category::extract_category(page, self.profile(), limit)
    }

    /// Convenience for one-off HTML: parses, extracts and returns only the
    /// chosen price.
    #[must_use]
    pub fn parse_price(self, html: &str) -> Option<Decimal> {
        let page = self.parse(&FetchedPage::new(self.profile().base_url, html));
        let policy = SelectionPolicy::new(false, self.profile().currency);
        self.extract_product(&page, None, &policy)
            .ok()
            .map(|s| s.price())
    }
}

impl std::fmt::Display for SiteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Title from JSON-LD, embedded product state, the site's title selectors,
/// then `og:title`.
fn product_title(page: &ParsedPage, profile: &SiteProfile) -> Option<String> {
    let from_jsonld = product_nodes(page.structured_data())
        .into_iter()
        .find_map(|node| string_field(node, &["name"]));
    if from_jsonld.is_some() {
        return from_jsonld;
    }
    if let Some(title) = product_state(page, profile).and_then(|p| string_field(p, &["title", "name"])) {
        return Some(title);
    }
    for css in profile.title_selectors {
        let sel = selector(css);
        let text = page
            .document()
            .select(&sel)
            .map(|node| node.text().collect::<String>())
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .find(|t| !t.is_empty());
        if text.is_some() {
            return text;
        }
    }
    page.document()
        .select(&selector("meta[property='og:title']"))
        .find_map(|node| node.value().attr("content"))
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

/// SKU from JSON-LD (`sku`, `mpn`) or the embedded product state.
fn product_sku(page: &ParsedPage, profile: &SiteProfile) -> Option<String> {
    product_nodes(page.structured_data())
        .into_iter()
        .find_map(|node| string_field(node, &["sku", "mpn"]))
        .or_else(|| product_state(page, profile).and_then(|p| string_field(p, profile.sku_keys)))
}

/// The product object inside embedded script state, found under one of the
/// profile's product keys.
fn product_state<'p>(page: &'p ParsedPage, profile: &SiteProfile) -> Option<&'p Value> {
    page.script_data()
        .iter()
        .find_map(|root| find_keyed_object(root, profile.product_json_keys, 0))
}

fn find_keyed_object<'v>(value: &'v Value, keys: &[&str], depth: usize) -> Option<&'v Value> {
    if depth > MAX_JSON_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            for key in keys {
                if let Some(found @ Value::Object(_)) = map.get(*key) {
                    return Some(found);
                }
            }
            map.values()
                .find_map(|child| find_keyed_object(child, keys, depth + 1))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|child| find_keyed_object(child, keys, depth + 1)),
        _ => None,
    }
}

fn string_field(node: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match node.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_is_case_insensitive() {
        assert_eq!(SiteAdapter::from_name("Petrovich").unwrap(), SiteAdapter::Petrovich);
        assert_eq!(SiteAdapter::from_name(" MK4S ").unwrap(), SiteAdapter::Mk4s);
        assert_eq!(SiteAdapter::from_name("white_hills").unwrap(), SiteAdapter::WhiteHills);
    }

    #[test]
    fn unknown_adapter_is_an_error() {
        let err = SiteAdapter::from_name("leroy").unwrap_err();
        assert!(matches!(err, ScraperError::UnknownAdapter { name } if name == "leroy"));
    }

    #[test]
    fn every_adapter_name_round_trips() {
        for adapter in SiteAdapter::ALL {
            assert_eq!(SiteAdapter::from_name(adapter.name()).unwrap(), adapter);
        }
    }

    #[test]
    fn absolute_url_resolution() {
        let profile = SiteAdapter::Mk4s.profile();
        assert_eq!(profile.absolute_url("/p/1"), "https://mk4s.ru/p/1");
        assert_eq!(profile.absolute_url("p/1"), "https://mk4s.ru/p/1");
        assert_eq!(profile.absolute_url("//cdn.mk4s.ru/x"), "https://cdn.mk4s.ru/x");
        assert_eq!(profile.absolute_url("https://other.ru/y"), "https://other.ru/y");
    }

    #[test]
    fn all_profile_selectors_parse() {
        for adapter in SiteAdapter::ALL {
            let profile = adapter.profile();
            for css in profile
                .price_selectors
                .iter()
                .chain(profile.title_selectors)
                .chain([profile.category.item, profile.category.price].iter())
                .chain(profile.category.link.iter())
                .chain(profile.category.title.iter())
            {
                assert!(scraper::Selector::parse(css).is_ok(), "{}: {css}", adapter.name());
            }
        }
    }

    #[test]
    fn empty_page_is_price_not_found() {
        let adapter = SiteAdapter::WhiteHills;
        let page = adapter.parse(&FetchedPage::new("https://whitehills.ru/p/1", "<html></html>"));
        let err = adapter
            .extract_product(&page, None, &SelectionPolicy::default())
            .unwrap_err();
        assert!(err.is_price_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn missing_variant_lists_available_options() {
        let adapter = SiteAdapter::Mk4s;
        let page = adapter.parse(&FetchedPage::new(
            "https://mk4s.ru/p/1",
            r#"<script>{"variants": {"Blue": {"price": 3333}, "Red": {"price": 3400}}}</script>"#,
        ));
        let err = adapter
            .extract_product(&page, Some("Green"), &SelectionPolicy::default())
            .unwrap_err();
        let message = err.to_string();
        assert!(err.is_price_not_found());
        assert!(message.contains("Blue, Red"), "{message}");
    }

    #[test]
    fn variant_request_on_plain_page_is_echoed() {
        let adapter = SiteAdapter::WhiteHills;
        let page = adapter.parse(&FetchedPage::new(
            "https://whitehills.ru/p/1",
            r#"<h1> Фанера  ФК </h1><meta itemprop="price" content="990">"#,
        ));
        let snapshot = adapter
            .extract_product(&page, Some("18mm"), &SelectionPolicy::default())
            .unwrap();
        assert_eq!(snapshot.variant_key(), Some("18mm"));
        assert_eq!(snapshot.title(), Some("Фанера ФК"));
        assert_eq!(snapshot.currency(), "RUB");
    }
}
