//! Conversion of free-form price text into exact decimals.
//!
//! Competitor pages render prices as `"1 790,50 ₽"`, `"2\u{A0}200 руб."`,
//! `"1,790.50"` and so on. Everything here works on [`Decimal`] so values can
//! be compared for equality and pushed downstream without float drift.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use thiserror::Error;

/// Non-breaking, figure, thin and narrow no-break spaces.
const EXOTIC_SPACES: [char; 4] = ['\u{00A0}', '\u{2007}', '\u{2009}', '\u{202F}'];

/// Stands in for a currency marker so digit groups never join across it.
const CURRENCY_STOP: &str = " | ";

static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(₽|руб\.?|р\.|rub|rur|usd|eur|грн|₸|\$|€|£)").expect("valid currency regex")
});

static NUMBER_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)*").expect("valid number token regex"));

static PRICE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d{1,2})?").expect("valid price prefix regex"));

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no numeric price in \"{input}\"")]
pub struct PriceParseError {
    pub input: String,
}

impl PriceParseError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_owned(),
        }
    }
}

/// Parses a human-formatted price into a decimal with at most two
/// fractional digits.
///
/// Whitespace of any kind that sits between two digits is a thousands
/// separator. A currency marker ends the number, so `"1 790 ₽ 2 000 ₽"` reads
/// as 1790. Commas become dots; when several dots remain, all but the last
/// are thousands separators.
///
/// # Errors
///
/// Returns [`PriceParseError`] when the text holds no digits.
pub fn normalize_price(text: &str) -> Result<Decimal, PriceParseError> {
    let without_currency = CURRENCY_RE.replace_all(text, CURRENCY_STOP);
    let compact = drop_digit_group_spaces(&without_currency).replace(',', ".");

    let token = NUMBER_TOKEN_RE
        .find(&compact)
        .ok_or_else(|| PriceParseError::new(text))?
        .as_str();

    let joined = join_thousands(token);
    let prefix = PRICE_PREFIX_RE
        .find(&joined)
        .ok_or_else(|| PriceParseError::new(text))?;

    Decimal::from_str(prefix.as_str()).map_err(|_| PriceParseError::new(text))
}

/// Converts a JSON scalar into a price.
///
/// Numbers are parsed exactly and rounded half-up to two places; strings go
/// through [`normalize_price`].
///
/// # Errors
///
/// Returns [`PriceParseError`] for non-numeric strings and for objects,
/// arrays, booleans and nulls.
pub fn decimal_from_json(value: &Value) -> Result<Decimal, PriceParseError> {
    match value {
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .map(round_price)
                .map_err(|_| PriceParseError::new(&raw))
        }
        Value::String(s) => normalize_price(s),
        other => Err(PriceParseError::new(&other.to_string())),
    }
}

/// ISO code for the first currency marker in `text`, if any.
#[must_use]
pub fn detect_currency(text: &str) -> Option<&'static str> {
    let found = CURRENCY_RE.find(text)?.as_str().to_lowercase();
    let code = match found.trim_end_matches('.') {
        "₽" | "руб" | "р" | "rub" | "rur" => "RUB",
        "usd" | "$" => "USD",
        "eur" | "€" => "EUR",
        "£" => "GBP",
        "грн" => "UAH",
        "₸" => "KZT",
        _ => return None,
    };
    Some(code)
}

/// Rounds to two decimal places, half away from zero.
///
/// Prices are never negative, so this is the familiar round-half-up.
#[must_use]
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Removes whitespace runs bounded by digits on both sides and collapses any
/// other whitespace run to a single space.
fn drop_digit_group_spaces(text: &str) -> String {
    let chars: Vec<char> = text
        .chars()
        .map(|c| if EXOTIC_SPACES.contains(&c) { ' ' } else { c })
        .collect();

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !c.is_whitespace() {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        let before_digit = start > 0 && chars[start - 1].is_ascii_digit();
        let after_digit = i < chars.len() && chars[i].is_ascii_digit();
        if !(before_digit && after_digit) && !out.is_empty() && i < chars.len() {
            out.push(' ');
        }
    }
    out
}

/// `"1.790.50"` becomes `"1790.50"`; single-dot and dot-free tokens pass through.
fn join_thousands(token: &str) -> String {
    match token.rsplit_once('.') {
        Some((int_part, frac)) if int_part.contains('.') => {
            format!("{}.{frac}", int_part.replace('.', ""))
        }
        _ => token.to_owned(),
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
