//! Stages 3 and 6: rendered DOM nodes.

use scraper::{ElementRef, Html, Selector};

use super::selector;
use crate::candidate::{PriceCandidate, Strategy};
use crate::hints::squash_text;
use crate::normalize::{detect_currency, normalize_price};

const CONTEXT_CHARS: usize = 160;
const MAX_NODES_PER_SELECTOR: usize = 20;
const MAX_ATTRIBUTE_CANDIDATES: usize = 50;
const MAX_LABEL_DEPTH: usize = 3;
/// Room for `руб.` or `RUB` next to the digits.
const MAX_PRICE_LETTERS: usize = 4;
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "meta", "head"];

/// Every node matched by the site's current-price selectors. Several nodes
/// (one per pricing tier) give several candidates.
pub(super) fn selector_candidates(document: &Html, selectors: &[&str]) -> Vec<PriceCandidate> {
    let mut out = Vec::new();
    for css in selectors {
        let sel = match Selector::parse(css) {
            Ok(sel) => sel,
            Err(e) => {
                tracing::warn!(selector = *css, error = %e, "skipping invalid price selector");
                continue;
            }
        };
        for node in document.select(&sel).take(MAX_NODES_PER_SELECTOR) {
            let text = node_text(node);
            let raw = if text.is_empty() {
                node.value()
                    .attr("content")
                    .or_else(|| node.value().attr("data-price"))
                    .unwrap_or_default()
                    .to_owned()
            } else {
                text
            };
            let Ok(value) = normalize_price(&raw) else {
                continue;
            };
            let context = node_context(node, Some(&sel));
            let currency = detect_currency(&raw)
                .or_else(|| detect_currency(&context))
                .map(str::to_owned);
            out.push(
                PriceCandidate::new(value, Strategy::DomSelector, *css, context)
                    .with_currency(currency),
            );
        }
    }
    out
}

/// Last-resort scan: `data-*` attributes mentioning price or cost,
/// `itemprop="price"` nodes and leaf elements whose class mentions price.
pub(super) fn attribute_candidates(document: &Html) -> Vec<PriceCandidate> {
    let mut out = Vec::new();
    for node in document.select(&selector("body *")) {
        if out.len() >= MAX_ATTRIBUTE_CANDIDATES {
            break;
        }
        let element = node.value();
        if SKIPPED_TAGS.contains(&element.name()) {
            continue;
        }

        for (name, raw) in element.attrs() {
            let lowered = name.to_ascii_lowercase();
            if !(lowered.starts_with("data-") && (lowered.contains("price") || lowered.contains("cost"))) {
                continue;
            }
            if let Ok(value) = normalize_price(raw) {
                out.push(PriceCandidate::new(
                    value,
                    Strategy::HtmlAttribute,
                    format!("[{lowered}]"),
                    node_context(node, None),
                ));
            }
        }

        if element.attr("itemprop") == Some("price") {
            let raw = element
                .attr("content")
                .map_or_else(|| node_text(node), str::to_owned);
            if let Ok(value) = normalize_price(&raw) {
                out.push(PriceCandidate::new(
                    value,
                    Strategy::HtmlAttribute,
                    "[itemprop=price]",
                    node_context(node, None),
                ));
            }
            continue;
        }

        let class_mentions_price = element
            .attr("class")
            .is_some_and(|c| c.to_lowercase().contains("price"));
        let is_leaf = !node.children().any(|child| child.value().is_element());
        if class_mentions_price && is_leaf {
            let text = node_text(node);
            if let Ok(value) = normalize_price(&text) {
                let currency = detect_currency(&text).map(str::to_owned);
                out.push(
                    PriceCandidate::new(
                        value,
                        Strategy::HtmlAttribute,
                        "[class*=price]",
                        node_context(node, None),
                    )
                    .with_currency(currency),
                );
            }
        }
    }
    out
}

pub(crate) fn node_text(node: ElementRef<'_>) -> String {
    squash_text(&node.text().collect::<String>(), CONTEXT_CHARS)
}

/// Class names of the node and its parent, the label that belongs to this
/// node and the node's own text.
///
/// Text belonging to a sibling price never leaks in: a container holding
/// several prices only lends the label adjacent to this node.
fn node_context(node: ElementRef<'_>, price_sel: Option<&Selector>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let parent = node.parent().and_then(ElementRef::wrap);

    if let Some(class) = parent.and_then(|p| p.value().attr("class")) {
        parts.push(class.to_owned());
    }
    if let Some(class) = node.value().attr("class") {
        parts.push(class.to_owned());
    }
    if let Some(label) = own_label(node, price_sel) {
        parts.push(label);
    }
    parts.push(node_text(node));

    squash_text(&parts.join(" "), CONTEXT_CHARS * 2)
}

struct Neighbour {
    text: String,
    is_price: bool,
    is_current: bool,
}

/// Looks for a label next to `node`, climbing while the node is the only
/// price in its container.
///
/// A container whose first meaningful child is a price labels prices with
/// the child that follows them (`950 ₽ по карте`); otherwise with the child
/// that precedes them (`по карте 950 ₽`).
fn own_label(node: ElementRef<'_>, price_sel: Option<&Selector>) -> Option<String> {
    let mut current = node;
    for _ in 0..MAX_LABEL_DEPTH {
        let container = current.parent().and_then(ElementRef::wrap)?;
        let neighbours = container_neighbours(container, current, price_sel);
        let at = neighbours.iter().position(|n| n.is_current)?;

        let suffix_labels = neighbours.first().is_some_and(|n| n.is_price);
        let adjacent = if suffix_labels {
            neighbours.get(at + 1)
        } else {
            at.checked_sub(1).and_then(|i| neighbours.get(i))
        };
        if let Some(label) = adjacent.filter(|n| !n.is_price) {
            return Some(label.text.clone());
        }

        if neighbours.iter().filter(|n| n.is_price).count() > 1 {
            return None;
        }
        current = container;
    }
    None
}

/// Non-empty element and text children of `container`, in document order.
fn container_neighbours(
    container: ElementRef<'_>,
    current: ElementRef<'_>,
    price_sel: Option<&Selector>,
) -> Vec<Neighbour> {
    let mut out = Vec::new();
    for child in container.children() {
        if child.id() == current.id() {
            out.push(Neighbour {
                text: node_text(current),
                is_price: true,
                is_current: true,
            });
            continue;
        }
        if let Some(element) = ElementRef::wrap(child) {
            if SKIPPED_TAGS.contains(&element.value().name()) {
                continue;
            }
            let text = node_text(element);
            if text.is_empty() {
                continue;
            }
            let matches_selector = price_sel
                .is_some_and(|sel| sel.matches(&element) || element.select(sel).next().is_some());
            out.push(Neighbour {
                is_price: matches_selector || looks_like_price(&text),
                text,
                is_current: false,
            });
        } else if let Some(raw) = child.value().as_text() {
            let text = squash_text(raw, CONTEXT_CHARS);
            if text.is_empty() {
                continue;
            }
            out.push(Neighbour {
                is_price: looks_like_price(&text),
                text,
                is_current: false,
            });
        }
    }
    out
}

/// A bare amount, optionally with a currency marker, as opposed to a label
/// that happens to mention a number.
fn looks_like_price(text: &str) -> bool {
    text.chars().filter(|c| c.is_alphabetic()).count() <= MAX_PRICE_LETTERS
        && normalize_price(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn one_candidate_per_matched_node() {
        let doc = Html::parse_document(
            r#"<div class="prices">
                <div class="row"><span class="label">Цена по карте</span><span class="price__current">900 ₽</span></div>
                <div class="row"><span class="label">Обычная цена</span><span class="price__current">1 000 ₽</span></div>
            </div>"#,
        );
        let found = selector_candidates(&doc, &[".price__current"]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value, Decimal::from(900));
        assert!(found[0].context.contains("Цена по карте"));
        assert!(found[1].context.contains("Обычная цена"));
        assert_eq!(found[1].currency.as_deref(), Some("RUB"));
    }

    #[test]
    fn label_after_both_prices_belongs_to_the_second() {
        let doc = Html::parse_document(
            r#"<div class="price-block"><span class="product-price__current">1 000 ₽</span><span class="product-price__current">950 ₽</span><small>по карте</small></div>"#,
        );
        let found = selector_candidates(&doc, &[".product-price__current"]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value, Decimal::from(1000));
        assert!(!found[0].context.contains("карте"), "{}", found[0].context);
        assert_eq!(found[1].value, Decimal::from(950));
        assert!(found[1].context.contains("по карте"));
    }

    #[test]
    fn card_text_inside_first_price_stays_with_it() {
        let doc = Html::parse_document(
            r#"<div class="price-block"><span class="product-price__current">950 ₽ <small>по карте</small></span><span class="product-price__current">1 000 ₽</span></div>"#,
        );
        let found = selector_candidates(&doc, &[".product-price__current"]);
        assert_eq!(found.len(), 2);
        assert!(found[0].context.contains("по карте"));
        assert!(!found[1].context.contains("карте"), "{}", found[1].context);
    }

    #[test]
    fn label_is_found_above_a_lone_price_wrapper() {
        let doc = Html::parse_document(
            r#"<div class="tier"><span>Цена по карте</span><div class="value"><b class="price">900 ₽</b></div></div>"#,
        );
        let found = selector_candidates(&doc, &[".price"]);
        assert!(found[0].context.contains("Цена по карте"), "{}", found[0].context);
    }

    #[test]
    fn bare_text_label_before_price() {
        let doc = Html::parse_document(
            r#"<p class="offer">Старая цена <span class="price">1 200 ₽</span></p>"#,
        );
        let found = selector_candidates(&doc, &[".price"]);
        assert!(found[0].context.contains("Старая цена"));
    }

    #[test]
    fn nested_selector_text() {
        let doc = Html::parse_document(
            r#"<div class="product-card__price-current"><span>2 500 ₽</span></div>"#,
        );
        let found = selector_candidates(&doc, &[".product-card__price-current span"]);
        assert_eq!(found[0].value, Decimal::from(2500));
    }

    #[test]
    fn empty_node_falls_back_to_data_price() {
        let doc = Html::parse_document(r#"<span class="p" data-price="777"></span>"#);
        let found = selector_candidates(&doc, &[".p"]);
        assert_eq!(found[0].value, Decimal::from(777));
    }

    #[test]
    fn invalid_selector_is_skipped() {
        let doc = Html::parse_document("<span class='p'>5</span>");
        let found = selector_candidates(&doc, &["[[", ".p"]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn attribute_scan_reads_data_attributes_and_leaves() {
        let doc = Html::parse_document(
            r#"<div data-product-price="1290" data-id="55"><i class="old-price">1 500</i></div>
               <script>var price = 10;</script>"#,
        );
        let found = attribute_candidates(&doc);
        let sources: Vec<&str> = found.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["[data-product-price]", "[class*=price]"]);
        assert_eq!(found[0].value, Decimal::from(1290));
        assert!(found[1].context.contains("old-price"));
    }

    #[test]
    fn attribute_scan_reads_itemprop_content() {
        let doc = Html::parse_document(r#"<span itemprop="price" content="450.00">450 ₽</span>"#);
        let found = attribute_candidates(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, Decimal::from(450));
    }
}
