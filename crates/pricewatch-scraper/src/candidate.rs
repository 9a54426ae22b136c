//! Price candidates: numbers recovered from a page that might be "the price".

use rust_decimal::Decimal;

/// Anything above this is a phone number, an article code or a timestamp,
/// not a retail price.
const MAX_PLAUSIBLE_PRICE: i64 = 100_000_000;

/// Which extraction strategy produced a candidate. Declaration order is
/// trust order: structured data first, heuristic attribute scraping last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    StructuredData,
    MetaTag,
    DomSelector,
    InlineScript,
    NetworkResponse,
    HtmlAttribute,
}

impl Strategy {
    /// 0 for the most trusted tier.
    #[must_use]
    pub fn tier(self) -> u8 {
        match self {
            Strategy::StructuredData => 0,
            Strategy::MetaTag => 1,
            Strategy::DomSelector => 2,
            Strategy::InlineScript => 3,
            Strategy::NetworkResponse => 4,
            Strategy::HtmlAttribute => 5,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::StructuredData => "structured-data",
            Strategy::MetaTag => "meta-tag",
            Strategy::DomSelector => "dom-selector",
            Strategy::InlineScript => "inline-script",
            Strategy::NetworkResponse => "network-response",
            Strategy::HtmlAttribute => "html-attribute",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One number found on a page, with enough provenance to audit the choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceCandidate {
    pub value: Decimal,
    pub strategy: Strategy,
    /// Text near the match (labels, parent node text, sibling key names).
    pub context: String,
    /// JSON key path or CSS selector the value came from.
    pub source: String,
    /// Currency stated next to the value, when the page says so explicitly.
    pub currency: Option<String>,
}

impl PriceCandidate {
    #[must_use]
    pub fn new(
        value: Decimal,
        strategy: Strategy,
        source: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            value,
            strategy,
            context: context.into(),
            source: source.into(),
            currency: None,
        }
    }

    #[must_use]
    pub fn with_currency(mut self, currency: Option<String>) -> Self {
        self.currency = currency.filter(|c| !c.trim().is_empty());
        self
    }

    /// Zero, negative and absurdly large values are never prices.
    #[must_use]
    pub fn is_plausible(&self) -> bool {
        self.value > Decimal::ZERO && self.value < Decimal::from(MAX_PLAUSIBLE_PRICE)
    }
}
