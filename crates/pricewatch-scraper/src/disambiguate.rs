//! Choosing the one price a walk-in customer pays from competing candidates.
//!
//! Pages routinely show a loyalty-card price, a struck-through "was" price
//! and a wholesale tier next to the real one. Each candidate gets a score
//! (lower is better) built from its strategy tier and from hint words found
//! in its context and source path.

use crate::candidate::PriceCandidate;
use crate::hints::hint_tokens;

const TIER_WEIGHT: i32 = 10;
const LOYALTY_PENALTY: i32 = 40;
const LOYALTY_BONUS: i32 = -15;
const SECONDARY_PENALTY: i32 = 30;
const REGULAR_BONUS: i32 = -10;
const CURRENCY_BONUS: i32 = -2;

const LOYALTY_WORDS: &[&str] = &["card", "loyalty", "bonus", "bonuses", "club", "member", "members", "gold", "vip"];
const LOYALTY_STEMS: &[&str] = &["карт", "бонус", "клуб", "лояльн"];

const SECONDARY_WORDS: &[&str] = &[
    "min", "minimum", "max", "maximum", "discount", "wholesale", "bulk", "old", "previous", "was",
    "crossed", "strike", "strikethrough", "compare", "low", "high", "opt",
];
const SECONDARY_STEMS: &[&str] = &["мин", "макс", "скидк", "опт", "стар", "прежн", "зачеркн", "было"];

const REGULAR_WORDS: &[&str] = &["regular", "retail", "standard", "default", "base", "usual"];
const REGULAR_STEMS: &[&str] = &["обычн", "розничн", "розниц", "стандарт", "базов"];

/// How to break ties between a card price and the walk-in price.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Score loyalty/card prices as better instead of worse.
    pub prefer_card_price: bool,
    /// ISO code the site prices in; candidates that confirm it get a small
    /// bonus.
    pub currency: Option<String>,
}

impl SelectionPolicy {
    #[must_use]
    pub fn new(prefer_card_price: bool, currency: impl Into<String>) -> Self {
        Self {
            prefer_card_price,
            currency: Some(currency.into()),
        }
    }
}

/// Consumes `candidates` and returns the best one, or `None` when the
/// sequence is empty. A lone candidate is returned without scoring.
pub fn select_price<I>(candidates: I, policy: &SelectionPolicy) -> Option<PriceCandidate>
where
    I: IntoIterator<Item = PriceCandidate>,
{
    let mut all: Vec<PriceCandidate> = candidates.into_iter().collect();
    if all.len() <= 1 {
        return all.pop();
    }

    let mut ranked: Vec<(i32, usize, PriceCandidate)> = all
        .into_iter()
        .enumerate()
        .map(|(idx, c)| (score_candidate(&c, policy), idx, c))
        .collect();
    ranked.sort_by(|(sa, ia, a), (sb, ib, b)| {
        sa.cmp(sb)
            .then(a.strategy.tier().cmp(&b.strategy.tier()))
            .then(a.source.len().cmp(&b.source.len()))
            .then_with(|| a.source.cmp(&b.source))
            .then(ia.cmp(ib))
    });

    if let [(best_score, _, best), (runner_score, _, runner), ..] = ranked.as_slice() {
        tracing::debug!(
            chosen = %best.value,
            chosen_source = %best.source,
            chosen_score = best_score,
            runner_up = %runner.value,
            runner_up_source = %runner.source,
            runner_up_score = runner_score,
            "disambiguated price candidates"
        );
    }

    ranked.into_iter().next().map(|(_, _, c)| c)
}

/// Priority score for one candidate; lower wins.
#[must_use]
pub fn score_candidate(candidate: &PriceCandidate, policy: &SelectionPolicy) -> i32 {
    let tokens = significant_tokens(&format!("{} {}", candidate.context, candidate.source));

    let mut score = i32::from(candidate.strategy.tier()) * TIER_WEIGHT;
    if matches_any(&tokens, LOYALTY_WORDS, LOYALTY_STEMS) {
        score += if policy.prefer_card_price {
            LOYALTY_BONUS
        } else {
            LOYALTY_PENALTY
        };
    }
    if matches_any(&tokens, SECONDARY_WORDS, SECONDARY_STEMS) {
        score += SECONDARY_PENALTY;
    }
    if matches_any(&tokens, REGULAR_WORDS, REGULAR_STEMS) {
        score += REGULAR_BONUS;
    }
    if confirms_currency(candidate, &tokens, policy) {
        score += CURRENCY_BONUS;
    }
    score
}

/// Hint tokens minus `card` when it follows `product`: `product-card` is a
/// layout class, not a loyalty price.
fn significant_tokens(text: &str) -> Vec<String> {
    let tokens = hint_tokens(text);
    let mut out = Vec::with_capacity(tokens.len());
    for (idx, token) in tokens.iter().enumerate() {
        let after_product = idx > 0 && tokens[idx - 1] == "product";
        if token == "card" && after_product {
            continue;
        }
        out.push(token.clone());
    }
    out
}

fn matches_any(tokens: &[String], words: &[&str], stems: &[&str]) -> bool {
    tokens
        .iter()
        .any(|t| words.contains(&t.as_str()) || stems.iter().any(|s| t.starts_with(s)))
}

fn confirms_currency(candidate: &PriceCandidate, tokens: &[String], policy: &SelectionPolicy) -> bool {
    let Some(expected) = policy.currency.as_deref() else {
        return false;
    };
    if candidate
        .currency
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case(expected))
    {
        return true;
    }
    let markers: &[&str] = match expected {
        "RUB" => &["₽", "руб", "rub", "р."],
        "USD" => &["$", "usd"],
        "EUR" => &["€", "eur"],
        _ => &[],
    };
    let context = candidate.context.to_lowercase();
    markers.iter().any(|m| context.contains(m))
        || tokens.iter().any(|t| t.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
#[path = "disambiguate_test.rs"]
mod tests;
