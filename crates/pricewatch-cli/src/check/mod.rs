//! The periodic price check: fetch every due product, detect changes against
//! the last known price, compute target prices, and push them downstream.
//!
//! Per-product failures are collected into a [`CheckReport`] rather than
//! propagated, so one broken page never aborts the batch.

pub(crate) mod state;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use pricewatch_core::{InventoryLink, ProductConfig, ProductSnapshot, Watchlist};
use pricewatch_pricing::{apply_pricing_rules, merge_rules, PriceTypeCache, PriceTypeSource, PricingError};
use pricewatch_scraper::{ProductRequest, ScraperError, ScraperService};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::sinks::{InventorySink, Notifier};
use state::PriceState;

/// Exact comparison; an unknown previous price always counts as a change.
pub(crate) fn price_changed(old: Option<Decimal>, new: Decimal) -> bool {
    old != Some(new)
}

/// Enabled products, never-checked first, then least recently checked,
/// capped at `batch_size`.
pub(crate) fn select_batch<'a>(
    watchlist: &'a Watchlist,
    state: &PriceState,
    batch_size: usize,
) -> Vec<&'a ProductConfig> {
    let mut due: Vec<&ProductConfig> = watchlist.products.iter().filter(|p| p.enabled).collect();
    due.sort_by_key(|p| state.last_checked_at(&p.key()));
    due.truncate(batch_size);
    due
}

/// Target prices for `product` at competitor price `price`.
///
/// Product and category rules are pooled. Without any rule the competitor
/// price is mirrored into the link price types, or into `default_price_types`
/// when no link names one.
pub(crate) fn build_price_map(
    watchlist: &Watchlist,
    product: &ProductConfig,
    price: Decimal,
    default_price_types: &[String],
) -> Result<BTreeMap<String, Decimal>, PricingError> {
    let rules = merge_rules(&product.rules, &watchlist.category_rules_for(product));
    if !rules.is_empty() {
        return apply_pricing_rules(price, &rules, None);
    }

    let mut fallback: Vec<String> = product
        .links
        .iter()
        .flat_map(|link| link.price_types.iter().cloned())
        .collect();
    if fallback.is_empty() {
        fallback = default_price_types.to_vec();
    }
    apply_pricing_rules(price, &[], Some(&fallback))
}

/// The prices to send for one inventory link.
///
/// A price type the rules did not produce takes the value of the first
/// default price type. A link naming no price types receives the whole map.
pub(crate) fn link_payload(
    link: &InventoryLink,
    price_map: &BTreeMap<String, Decimal>,
    default_price_types: &[String],
) -> BTreeMap<String, Decimal> {
    if link.price_types.is_empty() {
        return price_map.clone();
    }
    let default_value = default_price_types.first().and_then(|name| price_map.get(name));
    link.price_types
        .iter()
        .filter_map(|price_type| {
            let value = price_map.get(price_type).or(default_value)?;
            Some((price_type.clone(), *value))
        })
        .collect()
}

/// Emitted once per product whose competitor price moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PriceChangeEvent {
    pub product: String,
    pub site: String,
    pub url: String,
    pub title: Option<String>,
    pub variant: Option<String>,
    pub old_price: Option<Decimal>,
    pub new_price: Decimal,
    pub currency: String,
    pub codes: Vec<String>,
    pub price_types: Vec<String>,
    pub prices: BTreeMap<String, Decimal>,
    pub pushed: bool,
    pub detected_at: DateTime<Utc>,
}

/// Why a product check failed. The operator's remedy differs per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FailureKind {
    /// Site unreachable, slow, or blocking. Wait and retry.
    Unreachable,
    /// Page loaded but no price. Fix the adapter.
    PriceNotFound,
    /// Unknown site or malformed URL in the watchlist.
    Configuration,
    Pricing,
    Push,
}

impl FailureKind {
    fn from_scraper(err: &ScraperError) -> Self {
        match err {
            ScraperError::PriceNotFound { .. } | ScraperError::Snapshot(_) => {
                FailureKind::PriceNotFound
            }
            ScraperError::UnknownAdapter { .. } | ScraperError::InvalidUrl { .. } => {
                FailureKind::Configuration
            }
            _ => FailureKind::Unreachable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ProductFailure {
    pub product: String,
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct CheckReport {
    pub checked: usize,
    pub unchanged: usize,
    pub events: Vec<PriceChangeEvent>,
    pub failures: Vec<ProductFailure>,
}

impl CheckReport {
    pub(crate) fn count(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }
}

enum Outcome {
    Unchanged(Decimal),
    Changed(PriceChangeEvent),
}

/// Runs price checks against injected collaborators.
pub(crate) struct PriceMonitor<'a> {
    scraper: &'a ScraperService,
    inventory: &'a dyn InventorySink,
    notifier: &'a dyn Notifier,
    price_type_source: &'a dyn PriceTypeSource,
    price_types: PriceTypeCache,
    default_price_types: Vec<String>,
}

impl<'a> PriceMonitor<'a> {
    pub(crate) fn new(
        scraper: &'a ScraperService,
        inventory: &'a dyn InventorySink,
        notifier: &'a dyn Notifier,
        price_type_source: &'a dyn PriceTypeSource,
        price_types: PriceTypeCache,
        default_price_types: Vec<String>,
    ) -> Self {
        Self {
            scraper,
            inventory,
            notifier,
            price_type_source,
            price_types,
            default_price_types,
        }
    }

    /// Checks up to `batch_size` due products and updates `state` in place.
    ///
    /// Pages are fetched concurrently; change detection and pushes then run
    /// product by product.
    pub(crate) async fn run_check(
        &mut self,
        watchlist: &Watchlist,
        state: &mut PriceState,
        batch_size: usize,
    ) -> CheckReport {
        let batch = select_batch(watchlist, state, batch_size);
        let requests: Vec<ProductRequest> = batch
            .iter()
            .map(|p| ProductRequest::new(&p.site, &p.url, p.variant.clone()))
            .collect();
        tracing::info!(products = batch.len(), "starting price check");

        let results = self.scraper.fetch_products_parallel(&requests).await;

        let mut report = CheckReport::default();
        for (product, result) in batch.into_iter().zip(results) {
            report.checked += 1;
            let key = product.key();
            let now = Utc::now();
            match self
                .check_product(watchlist, product, result, state.last_price(&key), now)
                .await
            {
                Ok(Outcome::Unchanged(price)) => {
                    state.record(&key, price, now);
                    report.unchanged += 1;
                }
                Ok(Outcome::Changed(event)) => {
                    state.record(&key, event.new_price, now);
                    report.events.push(event);
                }
                Err(failure) => {
                    tracing::warn!(
                        product = %failure.product,
                        url = %failure.url,
                        kind = ?failure.kind,
                        error = %failure.message,
                        "price check failed"
                    );
                    state.touch(&key, now);
                    report.failures.push(failure);
                }
            }
        }

        tracing::info!(
            checked = report.checked,
            changed = report.events.len(),
            unchanged = report.unchanged,
            failed = report.failures.len(),
            "price check finished"
        );
        report
    }

    async fn check_product(
        &mut self,
        watchlist: &Watchlist,
        product: &ProductConfig,
        fetched: Result<ProductSnapshot, ScraperError>,
        old_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Outcome, ProductFailure> {
        let failure = |kind: FailureKind, message: String| ProductFailure {
            product: product.name.clone(),
            url: product.url.clone(),
            kind,
            message,
        };

        let snapshot = fetched.map_err(|e| failure(FailureKind::from_scraper(&e), e.to_string()))?;
        let new_price = snapshot.price();
        if !price_changed(old_price, new_price) {
            tracing::debug!(product = %product.name, price = %new_price, "price unchanged");
            return Ok(Outcome::Unchanged(new_price));
        }

        let price_map = build_price_map(watchlist, product, new_price, &self.default_price_types)
            .map_err(|e| failure(FailureKind::Pricing, e.to_string()))?;

        self.warn_unknown_price_types(&price_map).await;

        let pushed = self
            .push_prices(product, &price_map)
            .await
            .map_err(|e| failure(FailureKind::Push, format!("{e:#}")))?;

        let event = PriceChangeEvent {
            product: product.name.clone(),
            site: product.site.clone(),
            url: product.url.clone(),
            title: snapshot.title().map(str::to_owned),
            variant: snapshot.variant_key().map(str::to_owned),
            old_price,
            new_price,
            currency: snapshot.currency().to_owned(),
            codes: product.links.iter().map(|l| l.code.clone()).collect(),
            price_types: product
                .links
                .iter()
                .flat_map(|l| l.price_types.iter().cloned())
                .collect(),
            prices: price_map,
            pushed,
            detected_at: now,
        };

        if let Err(e) = self.notifier.notify(&event).await {
            tracing::warn!(product = %product.name, error = %e, "change notification failed");
        }
        Ok(Outcome::Changed(event))
    }

    /// Logs and returns the computed price types the inventory system does
    /// not list. Nothing is reported when the list cannot be refreshed.
    async fn warn_unknown_price_types(
        &mut self,
        price_map: &BTreeMap<String, Decimal>,
    ) -> Vec<String> {
        if let Err(e) = self.price_types.get_or_refresh(self.price_type_source).await {
            tracing::warn!(error = %e, "could not refresh price types");
            return Vec::new();
        }
        let unknown: Vec<String> = self
            .price_types
            .missing(price_map.keys().map(String::as_str))
            .into_iter()
            .map(str::to_owned)
            .collect();
        for name in &unknown {
            tracing::warn!(price_type = %name, "price type unknown to the inventory system");
        }
        unknown
    }

    /// Pushes to every auto-updating link at once. Returns whether anything
    /// was sent.
    async fn push_prices(
        &self,
        product: &ProductConfig,
        price_map: &BTreeMap<String, Decimal>,
    ) -> anyhow::Result<bool> {
        let pushes: Vec<(String, BTreeMap<String, Decimal>)> = product
            .links
            .iter()
            .filter(|link| link.auto_update)
            .map(|link| (link.code.clone(), link_payload(link, price_map, &self.default_price_types)))
            .filter(|(_, payload)| !payload.is_empty())
            .collect();
        if pushes.is_empty() {
            return Ok(false);
        }

        let results = join_all(
            pushes
                .iter()
                .map(|(code, payload)| self.inventory.update_prices(code, payload)),
        )
        .await;

        let failed: Vec<String> = pushes
            .iter()
            .zip(results)
            .filter_map(|((code, _), result)| result.err().map(|e| format!("{code}: {e:#}")))
            .collect();
        if !failed.is_empty() {
            anyhow::bail!("inventory update failed for {}", failed.join("; "));
        }
        Ok(true)
    }
}

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;
