//! Downstream collaborators of a price check: the inventory system, the
//! notification channel, and the source of known price-type names.
//!
//! Only logging/stdout implementations live here; real API clients plug in
//! behind the same traits.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use pricewatch_pricing::{PriceTypeSource, PricingError};
use rust_decimal::Decimal;

use crate::check::PriceChangeEvent;

/// Receives computed prices keyed by price-type name for one inventory code.
#[async_trait]
pub(crate) trait InventorySink: Send + Sync {
    async fn update_prices(&self, code: &str, prices: &BTreeMap<String, Decimal>)
        -> anyhow::Result<()>;
}

/// Receives one structured event per detected price change.
#[async_trait]
pub(crate) trait Notifier: Send + Sync {
    async fn notify(&self, event: &PriceChangeEvent) -> anyhow::Result<()>;
}

/// Logs the update instead of calling an inventory API.
pub(crate) struct LoggingInventory;

#[async_trait]
impl InventorySink for LoggingInventory {
    async fn update_prices(
        &self,
        code: &str,
        prices: &BTreeMap<String, Decimal>,
    ) -> anyhow::Result<()> {
        for (price_type, value) in prices {
            tracing::info!(code, price_type = %price_type, price = %value, "inventory price update");
        }
        Ok(())
    }
}

/// Writes each event to stdout as one JSON line.
pub(crate) struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, event: &PriceChangeEvent) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string(event)?);
        Ok(())
    }
}

/// Price types the inventory system accepts, as listed in
/// `PRICEWATCH_INVENTORY_PRICE_TYPES`. Stands in for the inventory API's
/// price-type endpoint.
pub(crate) struct ConfiguredPriceTypes {
    names: Vec<String>,
}

impl ConfiguredPriceTypes {
    pub(crate) fn new(names: &[String]) -> Self {
        let names: BTreeSet<String> = names.iter().cloned().collect();
        Self {
            names: names.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PriceTypeSource for ConfiguredPriceTypes {
    async fn price_type_names(&self) -> Result<Vec<String>, PricingError> {
        Ok(self.names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn configured_price_types_are_deduplicated_and_sorted() {
        let source = ConfiguredPriceTypes::new(&[
            "Розница".to_string(),
            "Опт".to_string(),
            "Розница".to_string(),
        ]);
        let names = source.price_type_names().await.unwrap();
        assert_eq!(names, vec!["Опт", "Розница"]);
    }
}
