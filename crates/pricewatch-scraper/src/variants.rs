//! Variant-bearing products (thickness, colour, pack size).
//!
//! Options are collected from JSON-LD (`hasVariant`, or several named
//! offers), then from embedded script state (`variants`, `offers`, `items`
//! maps and lists), then from DOM nodes carrying `data-variant*` and
//! `data-price`. The first source that exposes any option wins.

use std::collections::HashSet;

use scraper::ElementRef;
use serde_json::{Map, Value};

use crate::candidate::{PriceCandidate, Strategy};
use crate::extract::structured::{offer_candidates, offers_of, product_nodes};
use crate::extract::{selector, ParsedPage};
use crate::hints::hint_tokens;
use crate::json_walk::find_default_prices;
use crate::normalize::normalize_price;
use crate::sites::SiteProfile;

const MAX_CONTAINER_DEPTH: usize = 6;
const IDENTITY_KEYS: &[&str] = &["name", "title", "label", "sku", "id", "code", "article"];
const ATTRIBUTE_KEYS: &[&str] = &["attributes", "options", "properties", "params"];
const DOM_VARIANT_SELECTORS: &[&str] = &[
    "[data-variant-key][data-price]",
    "[data-variant][data-price]",
    "[data-offer-id][data-price]",
    "option[data-price]",
];

/// One purchasable combination and the price candidates that belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantOption {
    pub key: String,
    /// Other names for the option: title, SKU, id, attribute values.
    pub aliases: Vec<String>,
    pub candidates: Vec<PriceCandidate>,
    pub sku: Option<String>,
    pub payload: Value,
}

impl VariantOption {
    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    fn tokens(&self) -> HashSet<String> {
        self.names().flat_map(hint_tokens).collect()
    }
}

/// Joins the trimmed, non-empty `parts` with `|`.
///
/// ```
/// use pricewatch_scraper::build_variant_key;
///
/// assert_eq!(build_variant_key(["Blue ", "", " 18mm"]), "Blue|18mm");
/// ```
pub fn build_variant_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .filter_map(|p| {
            let trimmed = p.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Every priced option the page exposes, in page order.
#[must_use]
pub fn collect_variants(page: &ParsedPage, profile: &SiteProfile) -> Vec<VariantOption> {
    let from_jsonld = jsonld_variants(page.structured_data(), profile);
    if !from_jsonld.is_empty() {
        return from_jsonld;
    }
    let from_scripts = script_variants(page.script_data(), profile);
    if !from_scripts.is_empty() {
        return from_scripts;
    }
    dom_variants(page)
}

/// Picks the option matching `requested`.
///
/// Exact (then case-insensitive) matches on the key or any alias come first.
/// Otherwise the requested tokens must be a subset of the option's tokens
/// (or the other way round); the tightest fit wins. With no request the
/// first option is the default.
#[must_use]
pub fn select_variant<'v>(
    options: &'v [VariantOption],
    requested: Option<&str>,
) -> Option<&'v VariantOption> {
    let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
        return options.first();
    };

    if let Some(exact) = options.iter().find(|o| o.names().any(|n| n == requested)) {
        return Some(exact);
    }
    if let Some(folded) = options
        .iter()
        .find(|o| o.names().any(|n| n.to_lowercase() == requested.to_lowercase()))
    {
        return Some(folded);
    }

    let wanted: HashSet<String> = hint_tokens(requested).into_iter().collect();
    if wanted.is_empty() {
        return None;
    }
    options
        .iter()
        .filter_map(|option| {
            let have = option.tokens();
            if wanted.is_subset(&have) {
                Some(((0, have.len() - wanted.len()), option))
            } else if !have.is_empty() && have.is_subset(&wanted) {
                Some(((1, wanted.len() - have.len()), option))
            } else {
                None
            }
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, option)| option)
}

fn jsonld_variants(blocks: &[Value], profile: &SiteProfile) -> Vec<VariantOption> {
    let mut options = Vec::new();
    let mut seen = HashSet::new();

    for product in product_nodes(blocks) {
        if let Some(Value::Array(variants)) = product.get("hasVariant") {
            for (idx, variant) in variants.iter().enumerate() {
                let mut candidates = Vec::new();
                for (offer_idx, offer) in offers_of(variant).into_iter().enumerate() {
                    offer_candidates(
                        offer,
                        &format!("jsonld.hasVariant[{idx}].offers[{offer_idx}]"),
                        &mut candidates,
                    );
                }
                push_option(&mut options, &mut seen, variant, None, candidates, profile);
            }
            continue;
        }

        let offers = offers_of(product);
        let named = offers.iter().filter(|o| identity(o).is_some()).count();
        if offers.len() < 2 || named < offers.len() {
            continue;
        }
        for (idx, offer) in offers.into_iter().enumerate() {
            let mut candidates = Vec::new();
            offer_candidates(offer, &format!("jsonld.offers[{idx}]"), &mut candidates);
            push_option(&mut options, &mut seen, offer, None, candidates, profile);
        }
    }

    if options.len() < 2 {
        options.clear();
    }
    options
}

fn script_variants(payloads: &[Value], profile: &SiteProfile) -> Vec<VariantOption> {
    for (idx, payload) in payloads.iter().enumerate() {
        let mut options = Vec::new();
        let mut seen = HashSet::new();
        find_containers(
            payload,
            &format!("script[{idx}]"),
            0,
            profile,
            &mut options,
            &mut seen,
        );
        if !options.is_empty() {
            return options;
        }
    }
    Vec::new()
}

fn find_containers(
    value: &Value,
    path: &str,
    depth: usize,
    profile: &SiteProfile,
    options: &mut Vec<VariantOption>,
    seen: &mut HashSet<String>,
) {
    if depth > MAX_CONTAINER_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{path}.{key}");
                if profile.variant_json_keys.contains(&key.as_str()) {
                    let before = options.len();
                    container_options(key, child, &child_path, profile, options, seen);
                    if options.len() > before {
                        continue;
                    }
                }
                find_containers(child, &child_path, depth + 1, profile, options, seen);
            }
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                find_containers(item, &format!("{path}[{idx}]"), depth + 1, profile, options, seen);
            }
        }
        _ => {}
    }
}

/// Options from one `variants`-like container: a map from option name to
/// object, or a list of objects. Lists of a single item only count under the
/// `variants` key itself.
fn container_options(
    container_key: &str,
    container: &Value,
    path: &str,
    profile: &SiteProfile,
    options: &mut Vec<VariantOption>,
    seen: &mut HashSet<String>,
) {
    match container {
        Value::Object(map) if !map.is_empty() && map.values().all(Value::is_object) => {
            for (name, item) in map {
                let candidates = json_candidates(item, &format!("{path}.{name}"));
                push_option(options, seen, item, Some(name), candidates, profile);
            }
        }
        Value::Array(items) => {
            let objects: Vec<&Value> = items.iter().filter(|v| v.is_object()).collect();
            if objects.len() < 2 && container_key != "variants" {
                return;
            }
            for (idx, item) in objects.into_iter().enumerate() {
                let candidates = json_candidates(item, &format!("{path}[{idx}]"));
                push_option(options, seen, item, None, candidates, profile);
            }
        }
        _ => {}
    }
}

fn json_candidates(item: &Value, path: &str) -> Vec<PriceCandidate> {
    find_default_prices(item)
        .into_iter()
        .map(|hit| {
            PriceCandidate::new(
                hit.value,
                Strategy::InlineScript,
                format!("{path}.{}", hit.path),
                hit.context,
            )
        })
        .collect()
}

fn push_option(
    options: &mut Vec<VariantOption>,
    seen: &mut HashSet<String>,
    item: &Value,
    name: Option<&str>,
    candidates: Vec<PriceCandidate>,
    profile: &SiteProfile,
) {
    let Some(key) = name.map(str::to_owned).or_else(|| identity(item)) else {
        return;
    };
    if candidates.is_empty() || !seen.insert(key.clone()) {
        return;
    }

    let mut aliases: Vec<String> = IDENTITY_KEYS
        .iter()
        .filter_map(|k| scalar_string(item.get(*k)?))
        .filter(|alias| *alias != key)
        .collect();
    aliases.extend(attribute_values(item));
    aliases.dedup();

    let sku = profile
        .sku_keys
        .iter()
        .find_map(|k| item.get(*k).and_then(scalar_string));

    options.push(VariantOption {
        key,
        aliases,
        candidates,
        sku,
        payload: item.clone(),
    });
}

/// First identifying scalar of a JSON option.
fn identity(item: &Value) -> Option<String> {
    IDENTITY_KEYS
        .iter()
        .find_map(|k| item.get(*k).and_then(scalar_string))
}

fn scalar_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn attribute_values(item: &Value) -> Vec<String> {
    ATTRIBUTE_KEYS
        .iter()
        .filter_map(|k| item.get(*k))
        .flat_map(|attrs| match attrs {
            Value::Object(map) => map_values(map),
            Value::Array(items) => items
                .iter()
                .filter_map(|v| v.get("value").and_then(scalar_string))
                .collect(),
            _ => Vec::new(),
        })
        .collect()
}

fn map_values(map: &Map<String, Value>) -> Vec<String> {
    map.values().filter_map(scalar_string).collect()
}

fn dom_variants(page: &ParsedPage) -> Vec<VariantOption> {
    let mut options = Vec::new();
    let mut seen = HashSet::new();
    for css in DOM_VARIANT_SELECTORS {
        for node in page.document().select(&selector(css)) {
            if let Some(option) = dom_option(node, css) {
                if seen.insert(option.key.clone()) {
                    options.push(option);
                }
            }
        }
    }
    options
}

fn dom_option(node: ElementRef<'_>, css: &str) -> Option<VariantOption> {
    let element = node.value();
    let raw_price = element.attr("data-price")?;
    let value = normalize_price(raw_price).ok()?;
    let text = node.text().collect::<String>().trim().to_owned();

    let key = ["data-variant-key", "data-variant", "data-offer-id", "value"]
        .iter()
        .find_map(|attr| element.attr(attr).map(str::trim).filter(|v| !v.is_empty()))
        .map(str::to_owned)
        .or_else(|| (!text.is_empty()).then(|| text.clone()))?;

    let mut aliases = Vec::new();
    if !text.is_empty() && text != key {
        aliases.push(text.clone());
    }
    let sku = element.attr("data-sku").map(str::to_owned);
    if let Some(sku) = &sku {
        aliases.push(sku.clone());
    }

    let candidate = PriceCandidate::new(value, Strategy::DomSelector, css, text);
    Some(VariantOption {
        key,
        aliases,
        candidates: vec![candidate],
        sku,
        payload: Value::Null,
    })
}
