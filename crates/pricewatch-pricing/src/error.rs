use pricewatch_core::UnknownRuleKind;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error(transparent)]
    UnknownRuleKind(#[from] UnknownRuleKind),

    #[error("competitor price must not be negative, got {0}")]
    NegativePrice(Decimal),

    #[error("pricing rule {kind} has an empty price type")]
    EmptyPriceType { kind: String },

    #[error("price type lookup failed: {0}")]
    PriceTypeLookup(String),
}
