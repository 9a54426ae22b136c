//! Converts a competitor price into target prices per inventory price type.

use std::collections::BTreeMap;

use pricewatch_core::{PricingRuleSpec, RuleKind};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::PricingError;

/// Round to two decimals, halves away from zero.
#[must_use]
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn apply_rule(price: Decimal, rule: &PricingRuleSpec) -> Decimal {
    match rule.kind {
        RuleKind::PercentMarkup => price * (Decimal::ONE + rule.value / Decimal::ONE_HUNDRED),
        RuleKind::MinusFixed => (price - rule.value).max(Decimal::ZERO),
        RuleKind::EqualToCompetitor => price,
    }
}

/// Compute one target price per price type.
///
/// Rules are applied in `(priority, price_type)` order. When two rules name
/// the same price type the later one overwrites the earlier result. With no
/// rules every `fallback_price_types` entry receives the rounded competitor
/// price; with neither the map is empty.
///
/// # Errors
///
/// Returns [`PricingError::NegativePrice`] for a negative competitor price and
/// [`PricingError::EmptyPriceType`] when a rule names a blank price type.
pub fn apply_pricing_rules(
    competitor_price: Decimal,
    rules: &[PricingRuleSpec],
    fallback_price_types: Option<&[String]>,
) -> Result<BTreeMap<String, Decimal>, PricingError> {
    if competitor_price < Decimal::ZERO {
        return Err(PricingError::NegativePrice(competitor_price));
    }

    let mut ordered: Vec<&PricingRuleSpec> = rules.iter().collect();
    ordered.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.price_type.cmp(&b.price_type))
    });

    let mut result = BTreeMap::new();
    for rule in ordered {
        if rule.price_type.trim().is_empty() {
            return Err(PricingError::EmptyPriceType {
                kind: rule.kind.to_string(),
            });
        }
        let target = round_half_up(apply_rule(competitor_price, rule));
        if let Some(previous) = result.insert(rule.price_type.clone(), target) {
            tracing::debug!(
                price_type = %rule.price_type,
                %previous,
                %target,
                priority = rule.priority,
                "later pricing rule overrides earlier result"
            );
        }
    }

    if result.is_empty() {
        let rounded = round_half_up(competitor_price);
        for price_type in fallback_price_types.unwrap_or_default() {
            result.insert(price_type.clone(), rounded);
        }
    }

    Ok(result)
}

/// Build a rule from raw configuration strings, failing on an unknown kind.
///
/// # Errors
///
/// Returns [`PricingError::UnknownRuleKind`] when `kind` is not recognised.
pub fn rule_from_parts(
    kind: &str,
    value: Decimal,
    price_type: &str,
    priority: i32,
) -> Result<PricingRuleSpec, PricingError> {
    let kind: RuleKind = kind.parse()?;
    Ok(PricingRuleSpec::new(kind, value, price_type, priority))
}

/// Pool product-level and category-level rules, product rules first.
#[must_use]
pub fn merge_rules(product: &[PricingRuleSpec], category: &[&PricingRuleSpec]) -> Vec<PricingRuleSpec> {
    product
        .iter()
        .chain(category.iter().copied())
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
