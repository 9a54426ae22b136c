use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Priority assigned to rules that do not specify one.
pub const DEFAULT_RULE_PRIORITY: i32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown pricing rule kind \"{0}\"")]
pub struct UnknownRuleKind(pub String);

/// How a competitor price is turned into a target price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleKind {
    /// `price * (1 + value / 100)`
    PercentMarkup,
    /// `max(price - value, 0)`
    MinusFixed,
    /// The competitor price unchanged; `value` is ignored.
    EqualToCompetitor,
}

impl RuleKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::PercentMarkup => "percent_markup",
            RuleKind::MinusFixed => "minus_fixed",
            RuleKind::EqualToCompetitor => "equal_to_competitor",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = UnknownRuleKind;

    /// Accepts the snake-case names as well as the legacy upper-case
    /// identifiers (`PERCENT_MARKUP`, `MINUS_FIXED`, `EQUAL`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "percent_markup" | "percentmarkup" => Ok(RuleKind::PercentMarkup),
            "minus_fixed" | "minusfixed" => Ok(RuleKind::MinusFixed),
            "equal_to_competitor" | "equaltocompetitor" | "equal" => {
                Ok(RuleKind::EqualToCompetitor)
            }
            _ => Err(UnknownRuleKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for RuleKind {
    type Error = UnknownRuleKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleKind> for String {
    fn from(kind: RuleKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One configured pricing rule. Lower `priority` is applied first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRuleSpec {
    pub kind: RuleKind,
    /// Meaning depends on `kind`: a percentage, a fixed amount, or unused.
    #[serde(default)]
    pub value: Decimal,
    pub price_type: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

impl PricingRuleSpec {
    #[must_use]
    pub fn new(kind: RuleKind, value: Decimal, price_type: impl Into<String>, priority: i32) -> Self {
        Self {
            kind,
            value,
            price_type: price_type.into(),
            priority,
        }
    }
}

fn default_priority() -> i32 {
    DEFAULT_RULE_PRIORITY
}
