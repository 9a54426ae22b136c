use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    };

    let env = parse_environment(&or_default("PRICEWATCH_ENV", "development"))?;
    let log_level = or_default("PRICEWATCH_LOG_LEVEL", "info");
    let watchlist_path = PathBuf::from(or_default(
        "PRICEWATCH_WATCHLIST_PATH",
        "./config/watchlist.yaml",
    ));
    let state_path = PathBuf::from(or_default(
        "PRICEWATCH_STATE_PATH",
        "./state/last_prices.json",
    ));

    let scraper_request_timeout_secs = parse_u64("PRICEWATCH_SCRAPER_REQUEST_TIMEOUT_SECS", "20")?;
    let scraper_user_agent = or_default("PRICEWATCH_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_max_concurrent_per_site =
        parse_usize("PRICEWATCH_SCRAPER_MAX_CONCURRENT_PER_SITE", "4")?.max(1);
    let scraper_max_retries = parse_u32("PRICEWATCH_SCRAPER_MAX_RETRIES", "3")?;
    let scraper_retry_backoff_base_secs =
        parse_u64("PRICEWATCH_SCRAPER_RETRY_BACKOFF_BASE_SECS", "3")?;

    let default_price_types =
        split_list(&or_default("PRICEWATCH_DEFAULT_PRICE_TYPES", "Цена продажи"));
    if default_price_types.is_empty() {
        return Err(invalid(
            "PRICEWATCH_DEFAULT_PRICE_TYPES",
            "at least one price type is required".to_string(),
        ));
    }

    let inventory_price_types = lookup("PRICEWATCH_INVENTORY_PRICE_TYPES")
        .ok()
        .map(|raw| split_list(&raw))
        .filter(|names| !names.is_empty())
        .unwrap_or_else(|| default_price_types.clone());

    let price_check_batch_size = parse_usize("PRICEWATCH_PRICE_CHECK_BATCH_SIZE", "20")?;
    let category_bulk_limit = parse_usize("PRICEWATCH_CATEGORY_BULK_LIMIT", "200")?;
    let price_type_cache_ttl_secs = parse_u64("PRICEWATCH_PRICE_TYPE_CACHE_TTL_SECS", "3600")?;
    let prefer_card_price = parse_bool("PRICEWATCH_PREFER_CARD_PRICE", "false")?;

    Ok(AppConfig {
        env,
        log_level,
        watchlist_path,
        state_path,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_concurrent_per_site,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        default_price_types,
        inventory_price_types,
        price_check_batch_size,
        category_bulk_limit,
        price_type_cache_ttl_secs,
        prefer_card_price,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PRICEWATCH_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Split a comma-separated env value, dropping blank items.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
