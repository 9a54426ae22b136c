//! Generic tree walk over decoded JSON looking for price-shaped values.
//!
//! The walk is parameterised by a [`PriceKeys`] set (which key names denote a
//! price) and a path-scoring function that may veto or rank a hit based on
//! its full key path. Every adapter and every JSON source (inline scripts,
//! captured network bodies, variant maps) goes through the same walker.

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::hints::hint_tokens;
use crate::normalize::decimal_from_json;

const MAX_DEPTH: usize = 12;

/// Sibling keys whose string values label the price next to them.
const LABEL_KEYS: &[&str] = &["name", "title", "label", "type", "kind", "pricetype", "caption"];

/// Path tokens that mark a number as something other than a price.
const REJECT_TOKENS: &[&str] = &[
    "rating", "review", "reviews", "weight", "qty", "quantity", "stock", "count", "id", "width",
    "height", "length", "percent", "valid", "until", "date", "time", "currency", "unit", "step",
    "position", "index", "page", "version",
];

/// One step of a JSON path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Renders a path as `product.offers[0].price`.
pub(crate) fn render_path(path: &[PathSegment<'_>]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            PathSegment::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Key names that identify a price.
///
/// `specific` keys are prices wherever they appear. `generic` keys such as
/// `value` or `current` only count when an ancestor key is itself a price
/// key, e.g. `{"price": {"current": 149}}`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PriceKeys {
    pub specific: &'static [&'static str],
    pub generic: &'static [&'static str],
}

pub(crate) const DEFAULT_PRICE_KEYS: PriceKeys = PriceKeys {
    specific: &[
        "price",
        "currentprice",
        "pricevalue",
        "price_value",
        "saleprice",
        "regularprice",
        "retailprice",
        "finalprice",
        "baseprice",
        "actualprice",
        "lowprice",
        "highprice",
        "cost",
    ],
    generic: &["value", "amount", "current", "actual", "final", "retail", "regular", "sale"],
};

impl PriceKeys {
    fn is_specific(&self, lowered: &str, tokens: &[String]) -> bool {
        self.specific.contains(&lowered)
            || tokens.iter().any(|t| t == "price" || t == "prices" || t == "cost" || t == "цена")
    }

    fn is_generic(&self, lowered: &str) -> bool {
        self.generic.contains(&lowered)
    }
}

/// Default path scorer: vetoes paths that pass through a non-price field
/// (ratings, stock counts, ids, dates) and otherwise ranks shallower paths
/// first.
pub(crate) fn default_path_score(path: &[PathSegment<'_>]) -> Option<i32> {
    for segment in path {
        if let PathSegment::Key(key) = segment {
            let tokens = hint_tokens(key);
            if tokens.iter().any(|t| REJECT_TOKENS.contains(&t.as_str())) {
                return None;
            }
        }
    }
    i32::try_from(path.len()).ok()
}

/// A price-shaped value found in a JSON tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JsonHit {
    pub value: Decimal,
    pub path: String,
    /// Labels of sibling fields plus the key chain, for disambiguation.
    pub context: String,
    pub score: i32,
}

/// Walks `root` and returns every price hit, ordered by path score and then
/// by document order.
pub(crate) fn find_prices<F>(root: &Value, keys: PriceKeys, score: F) -> Vec<JsonHit>
where
    F: Fn(&[PathSegment<'_>]) -> Option<i32>,
{
    let mut walker = Walker {
        keys,
        score: &score,
        hits: Vec::new(),
    };
    let mut path = Vec::new();
    walker.walk(root, &mut path, false);
    let mut hits = walker.hits;
    hits.sort_by_key(|hit| hit.score);
    hits
}

/// [`find_prices`] with the default key set and path scorer.
pub(crate) fn find_default_prices(root: &Value) -> Vec<JsonHit> {
    find_prices(root, DEFAULT_PRICE_KEYS, default_path_score)
}

struct Walker<'s, F> {
    keys: PriceKeys,
    score: &'s F,
    hits: Vec<JsonHit>,
}

impl<F> Walker<'_, F>
where
    F: Fn(&[PathSegment<'_>]) -> Option<i32>,
{
    fn walk<'a>(&mut self, value: &'a Value, path: &mut Vec<PathSegment<'a>>, under_price: bool) {
        if path.len() > MAX_DEPTH {
            return;
        }
        match value {
            Value::Object(map) => self.walk_object(map, path, under_price),
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    path.push(PathSegment::Index(idx));
                    self.walk(item, path, under_price);
                    path.pop();
                }
            }
            _ => {}
        }
    }

    fn walk_object<'a>(
        &mut self,
        map: &'a Map<String, Value>,
        path: &mut Vec<PathSegment<'a>>,
        under_price: bool,
    ) {
        let labels = sibling_labels(map);
        for (key, child) in map {
            let lowered = key.to_lowercase();
            let tokens = hint_tokens(key);
            let specific = self.keys.is_specific(&lowered, &tokens);
            let generic = !specific && self.keys.is_generic(&lowered);

            path.push(PathSegment::Key(key));
            match child {
                Value::Number(_) | Value::String(_) => {
                    let accepted = specific
                        || (generic && under_price)
                        || (under_price && child.is_number());
                    if accepted {
                        self.record(child, path, &labels);
                    }
                }
                Value::Object(_) | Value::Array(_) => {
                    self.walk(child, path, under_price || specific);
                }
                _ => {}
            }
            path.pop();
        }
    }

    fn record(&mut self, leaf: &Value, path: &[PathSegment<'_>], labels: &str) {
        let Some(score) = (self.score)(path) else {
            return;
        };
        let Ok(value) = decimal_from_json(leaf) else {
            return;
        };
        let rendered = render_path(path);
        let context = if labels.is_empty() {
            rendered.clone()
        } else {
            format!("{labels} {rendered}")
        };
        self.hits.push(JsonHit {
            value,
            path: rendered,
            context,
            score,
        });
    }
}

fn sibling_labels(map: &Map<String, Value>) -> String {
    map.iter()
        .filter(|(key, _)| LABEL_KEYS.contains(&key.to_lowercase().as_str()))
        .filter_map(|(_, value)| value.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(hits: &[JsonHit]) -> Vec<&str> {
        hits.iter().map(|h| h.path.as_str()).collect()
    }

    #[test]
    fn finds_nested_generic_key_under_price() {
        let value = json!({"product": {"price": {"current": 149}}});
        let hits = find_default_prices(&value);
        assert_eq!(paths(&hits), vec!["product.price.current"]);
        assert_eq!(hits[0].value, Decimal::from(149));
    }

    #[test]
    fn generic_keys_alone_are_ignored() {
        let value = json!({"filter": {"value": 18, "amount": 3}});
        assert!(find_default_prices(&value).is_empty());
    }

    #[test]
    fn rejects_ratings_stock_and_ids() {
        let value = json!({
            "price": 990,
            "priceRating": 5,
            "stockPrice": 12,
            "priceId": 77,
            "priceValidUntil": "2025-12-31"
        });
        let hits = find_default_prices(&value);
        assert_eq!(paths(&hits), vec!["price"]);
    }

    #[test]
    fn array_paths_are_indexed_and_shallow_first() {
        let value = json!({"offers": [{"price": "1 790"}], "price": 1800});
        let hits = find_default_prices(&value);
        assert_eq!(paths(&hits), vec!["price", "offers[0].price"]);
        assert_eq!(hits[1].value, Decimal::from(1790));
    }

    #[test]
    fn sibling_labels_land_in_context() {
        let value = json!({"prices": [
            {"name": "Цена по карте", "value": 90},
            {"name": "Обычная цена", "value": 100}
        ]});
        let hits = find_default_prices(&value);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].context.starts_with("Цена по карте"));
        assert!(hits[1].context.starts_with("Обычная цена"));
    }

    #[test]
    fn custom_scorer_can_veto_everything() {
        let value = json!({"price": 10});
        let hits = find_prices(&value, DEFAULT_PRICE_KEYS, |_| None);
        assert!(hits.is_empty());
    }

    #[test]
    fn unparseable_strings_are_skipped() {
        let value = json!({"price": "по запросу", "salePrice": "1 200 ₽"});
        let hits = find_default_prices(&value);
        assert_eq!(paths(&hits), vec!["salePrice"]);
    }
}
