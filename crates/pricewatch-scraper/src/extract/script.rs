//! Stages 4 and 5: JSON recovered from inline scripts and network bodies.

use serde_json::Value;

use crate::candidate::{PriceCandidate, Strategy};
use crate::json_walk::find_default_prices;

/// Runs the shared price walker over each payload; `label` prefixes the
/// source path (`script[2].product.price`).
pub(super) fn json_candidates(
    payloads: &[Value],
    strategy: Strategy,
    label: &str,
) -> Vec<PriceCandidate> {
    let mut out = Vec::new();
    for (idx, payload) in payloads.iter().enumerate() {
        for hit in find_default_prices(payload) {
            let separator = if hit.path.starts_with('[') { "" } else { "." };
            out.push(PriceCandidate::new(
                hit.value,
                strategy,
                format!("{label}[{idx}]{separator}{}", hit.path),
                hit.context,
            ));
        }
    }
    out
}
