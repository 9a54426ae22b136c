//! Subcommand handlers. Each loads what it needs from [`AppConfig`] and
//! prints machine-readable JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pricewatch_core::{load_watchlist, AppConfig};
use pricewatch_pricing::PriceTypeCache;
use pricewatch_scraper::{
    FetchedPage, HttpFetcher, ScraperService, ServiceOptions, SiteAdapter, StaticFetcher,
};
use rust_decimal::Decimal;

use crate::check::state::PriceState;
use crate::check::{build_price_map, FailureKind, PriceMonitor};
use crate::sinks::{ConfiguredPriceTypes, LoggingInventory, StdoutNotifier};

fn build_scraper(config: &AppConfig) -> anyhow::Result<ScraperService> {
    let fetcher = HttpFetcher::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
        config.scraper_max_retries,
        config.scraper_retry_backoff_base_secs,
    )?;
    Ok(ScraperService::new(
        Arc::new(fetcher),
        ServiceOptions::from_config(config),
    ))
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs one batch of price checks and saves the updated state.
///
/// # Errors
///
/// Returns an error when the watchlist or state cannot be loaded or saved,
/// or when every checked product failed.
pub(crate) async fn run_check(config: &AppConfig, batch_size: Option<usize>) -> anyhow::Result<()> {
    let watchlist = load_watchlist(&config.watchlist_path)?;
    let mut state = PriceState::load(&config.state_path)?;
    let scraper = build_scraper(config)?;

    let inventory = LoggingInventory;
    let notifier = StdoutNotifier;
    let price_type_source = ConfiguredPriceTypes::new(&config.inventory_price_types);
    let cache = PriceTypeCache::new(Duration::from_secs(config.price_type_cache_ttl_secs));
    let mut monitor = PriceMonitor::new(
        &scraper,
        &inventory,
        &notifier,
        &price_type_source,
        cache,
        config.default_price_types.clone(),
    );

    let batch_size = batch_size
        .filter(|n| *n > 0)
        .unwrap_or(config.price_check_batch_size);
    let report = monitor.run_check(&watchlist, &mut state, batch_size).await;
    state.save(&config.state_path)?;

    eprintln!(
        "checked {} products: {} changed, {} unchanged, {} unreachable, {} without price, {} other failures",
        report.checked,
        report.events.len(),
        report.unchanged,
        report.count(FailureKind::Unreachable),
        report.count(FailureKind::PriceNotFound),
        report.failures.len()
            - report.count(FailureKind::Unreachable)
            - report.count(FailureKind::PriceNotFound),
    );

    if report.checked > 0 && report.failures.len() == report.checked {
        anyhow::bail!("all {} product checks failed", report.checked);
    }
    Ok(())
}

pub(crate) async fn run_fetch(
    config: &AppConfig,
    site: &str,
    url: &str,
    variant: Option<&str>,
) -> anyhow::Result<()> {
    let scraper = build_scraper(config)?;
    let snapshot = scraper.fetch_product(site, url, variant).await?;
    print_json(&snapshot)
}

pub(crate) async fn run_category(config: &AppConfig, site: &str, url: &str) -> anyhow::Result<()> {
    let scraper = build_scraper(config)?;
    let snapshots = scraper.fetch_category(site, url).await?;
    tracing::info!(site, url, items = snapshots.len(), "category extracted");
    print_json(&snapshots)
}

/// Runs the extractor over a saved page through a [`StaticFetcher`].
pub(crate) async fn run_extract(
    config: &AppConfig,
    site: &str,
    file: &Path,
    url: Option<String>,
    variant: Option<&str>,
    network: &[PathBuf],
) -> anyhow::Result<()> {
    let adapter = SiteAdapter::from_name(site)?;
    let html = read_input(file)?;
    let bodies = network
        .iter()
        .map(|path| read_input(path))
        .collect::<anyhow::Result<Vec<String>>>()?;

    let url = url.unwrap_or_else(|| adapter.profile().base_url.to_owned());
    let fetcher = StaticFetcher::new()
        .with_page(FetchedPage::new(url.clone(), html).with_network_bodies(bodies));
    let scraper = ScraperService::new(Arc::new(fetcher), ServiceOptions::from_config(config));
    let snapshot = scraper.fetch_product(adapter.name(), &url, variant).await?;
    print_json(&snapshot)
}

/// Prints the price-type map a product would receive at `price`.
pub(crate) fn run_price(config: &AppConfig, product_name: &str, price: Decimal) -> anyhow::Result<()> {
    let watchlist = load_watchlist(&config.watchlist_path)?;
    let product = watchlist
        .products
        .iter()
        .find(|p| p.name == product_name)
        .ok_or_else(|| anyhow::anyhow!("product '{product_name}' not found in watchlist"))?;
    let map = build_price_map(&watchlist, product, price, &config.default_price_types)?;
    print_json(&map)
}

/// Checks the watchlist parses and every product names a known site.
pub(crate) fn run_validate(config: &AppConfig) -> anyhow::Result<()> {
    let watchlist = load_watchlist(&config.watchlist_path)?;
    let sites = watchlist
        .products
        .iter()
        .map(|p| p.site.as_str())
        .chain(watchlist.categories.iter().map(|c| c.site.as_str()));
    for site in sites {
        SiteAdapter::from_name(site)?;
    }
    println!(
        "watchlist ok: {} products ({} enabled), {} categories",
        watchlist.products.len(),
        watchlist.products.iter().filter(|p| p.enabled).count(),
        watchlist.categories.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_input_keeps_the_io_error_as_source() {
        let path = Path::new("/nonexistent/pricewatch/page.html");
        let err = read_input(path).unwrap_err();
        assert_eq!(err.to_string(), format!("failed to read {}", path.display()));
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
