use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "PRICEWATCH_ENV"));
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(
        cfg.watchlist_path.to_string_lossy(),
        "./config/watchlist.yaml"
    );
    assert_eq!(cfg.scraper_request_timeout_secs, 20);
    assert_eq!(cfg.scraper_max_concurrent_per_site, 4);
    assert_eq!(cfg.scraper_max_retries, 3);
    assert_eq!(cfg.scraper_retry_backoff_base_secs, 3);
    assert_eq!(cfg.default_price_types, vec!["Цена продажи".to_string()]);
    assert_eq!(cfg.inventory_price_types, cfg.default_price_types);
    assert_eq!(cfg.price_check_batch_size, 20);
    assert_eq!(cfg.category_bulk_limit, 200);
    assert_eq!(cfg.price_type_cache_ttl_secs, 3600);
    assert!(!cfg.prefer_card_price);
    assert!(cfg.scraper_user_agent.starts_with("Mozilla/5.0"));
}

#[test]
fn default_price_types_split_on_commas() {
    let mut map = HashMap::new();
    map.insert(
        "PRICEWATCH_DEFAULT_PRICE_TYPES",
        "Розница, Интернет ,, Опт",
    );
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.default_price_types, vec!["Розница", "Интернет", "Опт"]);
}

#[test]
fn default_price_types_blank_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PRICEWATCH_DEFAULT_PRICE_TYPES", " , ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWATCH_DEFAULT_PRICE_TYPES"),
        "expected InvalidEnvVar(PRICEWATCH_DEFAULT_PRICE_TYPES), got: {result:?}"
    );
}

#[test]
fn inventory_price_types_are_read_separately() {
    let mut map = HashMap::new();
    map.insert("PRICEWATCH_DEFAULT_PRICE_TYPES", "Розница");
    map.insert("PRICEWATCH_INVENTORY_PRICE_TYPES", "Розница, Опт");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.default_price_types, vec!["Розница"]);
    assert_eq!(cfg.inventory_price_types, vec!["Розница", "Опт"]);
}

#[test]
fn blank_inventory_price_types_fall_back_to_defaults() {
    let mut map = HashMap::new();
    map.insert("PRICEWATCH_DEFAULT_PRICE_TYPES", "Розница");
    map.insert("PRICEWATCH_INVENTORY_PRICE_TYPES", " ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.inventory_price_types, vec!["Розница"]);
}

#[test]
fn max_concurrent_per_site_is_clamped_to_one() {
    let mut map = HashMap::new();
    map.insert("PRICEWATCH_SCRAPER_MAX_CONCURRENT_PER_SITE", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.scraper_max_concurrent_per_site, 1);
}

#[test]
fn scraper_request_timeout_secs_invalid() {
    let mut map = HashMap::new();
    map.insert("PRICEWATCH_SCRAPER_REQUEST_TIMEOUT_SECS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWATCH_SCRAPER_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(PRICEWATCH_SCRAPER_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn scraper_max_retries_override() {
    let mut map = HashMap::new();
    map.insert("PRICEWATCH_SCRAPER_MAX_RETRIES", "5");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.scraper_max_retries, 5);
}

#[test]
fn prefer_card_price_accepts_common_booleans() {
    for (raw, expected) in [("true", true), ("1", true), ("no", false), ("OFF", false)] {
        let mut map = HashMap::new();
        map.insert("PRICEWATCH_PREFER_CARD_PRICE", raw);
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.prefer_card_price, expected, "input {raw}");
    }
}

#[test]
fn prefer_card_price_rejects_garbage() {
    let mut map = HashMap::new();
    map.insert("PRICEWATCH_PREFER_CARD_PRICE", "sometimes");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PRICEWATCH_PREFER_CARD_PRICE")
    );
}
