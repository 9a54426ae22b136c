//! Stage 1: schema.org JSON-LD.

use serde_json::Value;

use crate::candidate::{PriceCandidate, Strategy};
use crate::normalize::decimal_from_json;

const PRODUCT_TYPES: &[&str] = &["Product", "ProductGroup", "IndividualProduct", "ProductModel"];
const OFFER_TYPES: &[&str] = &["Offer", "AggregateOffer"];
const OFFER_PRICE_KEYS: &[&str] = &["price", "lowPrice", "highPrice"];

/// Flattens top-level arrays and `@graph` containers into individual nodes.
pub(crate) fn jsonld_nodes(blocks: &[Value]) -> Vec<&Value> {
    let mut nodes = Vec::new();
    for block in blocks {
        let items: Vec<&Value> = match block {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for item in items {
            nodes.push(item);
            if let Some(graph) = item.get("@graph").and_then(Value::as_array) {
                nodes.extend(graph.iter());
            }
        }
    }
    nodes
}

/// `true` when `@type` (a string or an array of strings) names one of `types`.
pub(crate) fn has_type(node: &Value, types: &[&str]) -> bool {
    match node.get("@type") {
        Some(Value::String(s)) => types.iter().any(|t| s.eq_ignore_ascii_case(t)),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| types.iter().any(|t| s.eq_ignore_ascii_case(t))),
        _ => false,
    }
}

/// JSON-LD product nodes, including variants listed under `hasVariant`.
pub(crate) fn product_nodes(blocks: &[Value]) -> Vec<&Value> {
    let mut products = Vec::new();
    for node in jsonld_nodes(blocks) {
        if has_type(node, PRODUCT_TYPES) {
            products.push(node);
            if let Some(Value::Array(variants)) = node.get("hasVariant") {
                products.extend(variants.iter().filter(|v| v.is_object()));
            }
        }
    }
    products
}

/// The `offers` of a product node as a list, whether written as an object
/// or an array.
pub(crate) fn offers_of(product: &Value) -> Vec<&Value> {
    match product.get("offers") {
        Some(Value::Array(items)) => items.iter().filter(|v| v.is_object()).collect(),
        Some(offer @ Value::Object(_)) => vec![offer],
        _ => Vec::new(),
    }
}

pub(super) fn structured_candidates(blocks: &[Value]) -> Vec<PriceCandidate> {
    let mut out = Vec::new();
    for (node_idx, node) in jsonld_nodes(blocks).into_iter().enumerate() {
        let label = format!("jsonld[{node_idx}]");
        if has_type(node, PRODUCT_TYPES) {
            for (offer_idx, offer) in offers_of(node).into_iter().enumerate() {
                offer_candidates(offer, &format!("{label}.offers[{offer_idx}]"), &mut out);
            }
        } else if has_type(node, OFFER_TYPES) {
            offer_candidates(node, &label, &mut out);
        }
    }
    out
}

/// Candidates for one `Offer` / `AggregateOffer` node. Nested `offers` of an
/// aggregate and `priceSpecification` entries are included.
pub(crate) fn offer_candidates(offer: &Value, source: &str, out: &mut Vec<PriceCandidate>) {
    let currency = offer
        .get("priceCurrency")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let context = offer_context(offer);

    for key in OFFER_PRICE_KEYS {
        let Some(raw) = offer.get(*key) else {
            continue;
        };
        if let Ok(value) = decimal_from_json(raw) {
            out.push(
                PriceCandidate::new(
                    value,
                    Strategy::StructuredData,
                    format!("{source}.{key}"),
                    context.clone(),
                )
                .with_currency(currency.clone()),
            );
        }
    }

    let specs: Vec<&Value> = match offer.get("priceSpecification") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(spec @ Value::Object(_)) => vec![spec],
        _ => Vec::new(),
    };
    for (idx, spec) in specs.into_iter().enumerate() {
        let Some(Ok(value)) = spec.get("price").map(decimal_from_json) else {
            continue;
        };
        let spec_currency = spec
            .get("priceCurrency")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| currency.clone());
        out.push(
            PriceCandidate::new(
                value,
                Strategy::StructuredData,
                format!("{source}.priceSpecification[{idx}].price"),
                format!("{context} {}", offer_context(spec)).trim().to_owned(),
            )
            .with_currency(spec_currency),
        );
    }

    if let Some(Value::Array(nested)) = offer.get("offers") {
        for (idx, inner) in nested.iter().enumerate() {
            offer_candidates(inner, &format!("{source}.offers[{idx}]"), out);
        }
    }
}

fn offer_context(node: &Value) -> String {
    ["name", "description", "priceType", "category"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
