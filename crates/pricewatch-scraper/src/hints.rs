//! Tokenisation shared by the disambiguator, the JSON walker and variant
//! matching.

/// Splits `text` into lowercase word tokens.
///
/// Boundaries are non-alphanumeric characters, `camelCase` humps and
/// letter/digit transitions, so `cardPrice`, `card_price` and `card-price`
/// all tokenise to `["card", "price"]` and `18mm` to `["18", "mm"]`.
pub(crate) fn hint_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            flush(&mut current, &mut tokens);
            prev = None;
            continue;
        }
        if let Some(p) = prev {
            let camel_hump = p.is_lowercase() && ch.is_uppercase();
            let digit_edge = p.is_numeric() != ch.is_numeric();
            if camel_hump || digit_edge {
                flush(&mut current, &mut tokens);
            }
        }
        current.extend(ch.to_lowercase());
        prev = Some(ch);
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

/// Truncates `text` to at most `max_chars` characters after collapsing
/// whitespace runs.
pub(crate) fn squash_text(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => collapsed[..cut].to_owned(),
        None => collapsed,
    }
}
