use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings for a price check run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub watchlist_path: PathBuf,
    /// JSON file holding the last known competitor price per product.
    pub state_path: PathBuf,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    /// Upper bound on simultaneous page fetches against a single site.
    pub scraper_max_concurrent_per_site: usize,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    /// Price types that mirror the competitor price when a product has no rules.
    pub default_price_types: Vec<String>,
    /// Price-type names the inventory system is known to accept. Computed
    /// types outside this list are logged as unknown.
    pub inventory_price_types: Vec<String>,
    pub price_check_batch_size: usize,
    pub category_bulk_limit: usize,
    pub price_type_cache_ttl_secs: u64,
    /// When `true` the disambiguator favours loyalty-card prices instead of
    /// penalising them.
    pub prefer_card_price: bool,
}
