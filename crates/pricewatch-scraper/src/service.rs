//! The scraper's public entry points: one product, one category listing, or
//! a batch of products fetched concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;

use pricewatch_core::{AppConfig, ProductSnapshot};

use crate::disambiguate::SelectionPolicy;
use crate::error::ScraperError;
use crate::fetch::{FetchedPage, PageFetcher};
use crate::sites::SiteAdapter;

/// Tuning knobs for [`ScraperService`].
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Simultaneous in-flight fetches allowed per site.
    pub max_concurrent_per_site: usize,
    /// Deadline for one fetch, retries included.
    pub fetch_timeout: Duration,
    pub prefer_card_price: bool,
    /// Maximum items returned from one category page.
    pub category_limit: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_concurrent_per_site: 4,
            fetch_timeout: Duration::from_secs(60),
            prefer_card_price: false,
            category_limit: 200,
        }
    }
}

impl ServiceOptions {
    /// The per-fetch deadline leaves room for every configured retry.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let attempts = u64::from(config.scraper_max_retries) + 1;
        Self {
            max_concurrent_per_site: config.scraper_max_concurrent_per_site.max(1),
            fetch_timeout: Duration::from_secs(
                config
                    .scraper_request_timeout_secs
                    .saturating_mul(attempts)
                    .saturating_add(config.scraper_retry_backoff_base_secs.saturating_mul(attempts)),
            ),
            prefer_card_price: config.prefer_card_price,
            category_limit: config.category_bulk_limit,
        }
    }
}

/// One product to fetch in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRequest {
    pub site: String,
    pub url: String,
    pub variant: Option<String>,
}

impl ProductRequest {
    #[must_use]
    pub fn new(site: impl Into<String>, url: impl Into<String>, variant: Option<String>) -> Self {
        Self {
            site: site.into(),
            url: url.into(),
            variant,
        }
    }
}

/// Fetches and extracts competitor prices.
///
/// The injected [`PageFetcher`] is shared by every site; a per-site
/// semaphore caps how many fetches hit one site at once. The permit is held
/// only while the page downloads; parsing happens after it is released.
pub struct ScraperService {
    fetcher: Arc<dyn PageFetcher>,
    options: ServiceOptions,
    permits: HashMap<SiteAdapter, Semaphore>,
}

impl ScraperService {
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, options: ServiceOptions) -> Self {
        let per_site = options.max_concurrent_per_site.max(1);
        let permits = SiteAdapter::ALL
            .iter()
            .map(|adapter| (*adapter, Semaphore::new(per_site)))
            .collect();
        Self {
            fetcher,
            options,
            permits,
        }
    }

    #[must_use]
    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Fetches `url` with the `site` adapter and returns the priced snapshot.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UnknownAdapter`] for an unregistered site name.
    /// - [`ScraperError::PriceNotFound`] when the page loaded but carried no
    ///   plausible price.
    /// - Any transport error from the fetcher, or [`ScraperError::Timeout`].
    pub async fn fetch_product(
        &self,
        site: &str,
        url: &str,
        variant: Option<&str>,
    ) -> Result<ProductSnapshot, ScraperError> {
        let adapter = SiteAdapter::from_name(site)?;
        let page = self.fetch_page(adapter, url).await?;
        let policy = SelectionPolicy::new(self.options.prefer_card_price, adapter.profile().currency);
        extract_product(adapter, &page, variant, &policy)
    }

    /// Fetches a category listing. Cards without a link or price are
    /// skipped, not failed.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnknownAdapter`] or the fetcher's error.
    pub async fn fetch_category(
        &self,
        site: &str,
        url: &str,
    ) -> Result<Vec<ProductSnapshot>, ScraperError> {
        let adapter = SiteAdapter::from_name(site)?;
        let page = self.fetch_page(adapter, url).await?;
        Ok(extract_category(adapter, &page, self.options.category_limit))
    }

    /// Fetches every request concurrently and returns one result per request,
    /// in request order. Failures stay isolated to their own slot.
    pub async fn fetch_products_parallel(
        &self,
        requests: &[ProductRequest],
    ) -> Vec<Result<ProductSnapshot, ScraperError>> {
        let width = self.options.max_concurrent_per_site.max(1) * SiteAdapter::ALL.len();
        stream::iter(requests)
            .map(|req| self.fetch_product(&req.site, &req.url, req.variant.as_deref()))
            .buffered(width)
            .collect()
            .await
    }

    async fn fetch_page(&self, adapter: SiteAdapter, url: &str) -> Result<FetchedPage, ScraperError> {
        let semaphore = &self.permits[&adapter];
        let _permit = semaphore
            .acquire()
            .await
            .expect("site semaphores are never closed");

        let deadline = self.options.fetch_timeout;
        match tokio::time::timeout(deadline, self.fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(site = adapter.name(), url, timeout_secs = deadline.as_secs(), "fetch timed out");
                Err(ScraperError::Timeout {
                    url: url.to_owned(),
                    timeout_secs: deadline.as_secs(),
                })
            }
        }
    }
}

// The parsed DOM is not `Send`; keeping it inside these synchronous helpers
// keeps the service futures `Send`.
fn extract_product(
    adapter: SiteAdapter,
    page: &FetchedPage,
    variant: Option<&str>,
    policy: &SelectionPolicy,
) -> Result<ProductSnapshot, ScraperError> {
    let parsed = adapter.parse(page);
    adapter.extract_product(&parsed, variant, policy)
}

fn extract_category(adapter: SiteAdapter, page: &FetchedPage, limit: usize) -> Vec<ProductSnapshot> {
    let parsed = adapter.parse(page);
    adapter.extract_category(&parsed, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch_core::Environment;
    use std::path::PathBuf;

    fn config() -> AppConfig {
        AppConfig {
            env: Environment::Test,
            log_level: "debug".to_owned(),
            watchlist_path: PathBuf::from("watchlist.yaml"),
            state_path: PathBuf::from("state.json"),
            scraper_request_timeout_secs: 20,
            scraper_user_agent: "pricewatch-test/0.1".to_owned(),
            scraper_max_concurrent_per_site: 0,
            scraper_max_retries: 3,
            scraper_retry_backoff_base_secs: 3,
            default_price_types: vec!["Цена продажи".to_owned()],
            inventory_price_types: vec!["Цена продажи".to_owned()],
            price_check_batch_size: 20,
            category_bulk_limit: 150,
            price_type_cache_ttl_secs: 3600,
            prefer_card_price: true,
        }
    }

    #[test]
    fn options_from_config_cover_retries() {
        let opts = ServiceOptions::from_config(&config());
        // four attempts of 20s plus 3s back-off base each
        assert_eq!(opts.fetch_timeout, Duration::from_secs(92));
        assert_eq!(opts.max_concurrent_per_site, 1);
        assert_eq!(opts.category_limit, 150);
        assert!(opts.prefer_card_price);
    }
}
