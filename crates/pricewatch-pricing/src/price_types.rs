//! Cache of the price-type names known to the inventory system.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::PricingError;

/// Where price-type names come from, typically the inventory API.
#[async_trait]
pub trait PriceTypeSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`PricingError::PriceTypeLookup`] when the names cannot be fetched.
    async fn price_type_names(&self) -> Result<Vec<String>, PricingError>;
}

/// Price-type names with a TTL, refreshed on demand by the owner.
#[derive(Debug, Clone)]
pub struct PriceTypeCache {
    names: Vec<String>,
    fetched_at: Option<Instant>,
    ttl: Duration,
}

impl PriceTypeCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            names: Vec::new(),
            fetched_at: None,
            ttl,
        }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `true` when never filled or older than the TTL at `now`.
    #[must_use]
    pub fn is_stale_at(&self, now: Instant) -> bool {
        match self.fetched_at {
            Some(at) => now.saturating_duration_since(at) >= self.ttl,
            None => true,
        }
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Instant::now())
    }

    /// Force the next [`get_or_refresh`](Self::get_or_refresh) to hit the source.
    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    /// Replace the cached names with a fresh copy from `source`.
    ///
    /// # Errors
    ///
    /// Propagates the source error; the previous names are kept.
    pub async fn refresh(&mut self, source: &dyn PriceTypeSource) -> Result<&[String], PricingError> {
        let names = source.price_type_names().await?;
        tracing::debug!(count = names.len(), "price types refreshed");
        self.names = names;
        self.fetched_at = Some(Instant::now());
        Ok(&self.names)
    }

    /// Cached names, refreshed first when stale.
    ///
    /// # Errors
    ///
    /// Propagates the source error from a refresh.
    pub async fn get_or_refresh(
        &mut self,
        source: &dyn PriceTypeSource,
    ) -> Result<&[String], PricingError> {
        if self.is_stale() {
            return self.refresh(source).await;
        }
        Ok(&self.names)
    }

    /// Requested names the inventory system does not know yet.
    #[must_use]
    pub fn missing<'a>(&self, wanted: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        wanted
            .into_iter()
            .filter(|name| !self.names.iter().any(|known| known == name))
            .collect()
    }
}
