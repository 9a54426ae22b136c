mod app_config;
mod config;
mod products;
mod rules;
mod watchlist;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{ProductSnapshot, SnapshotError};
pub use rules::{PricingRuleSpec, RuleKind, UnknownRuleKind, DEFAULT_RULE_PRIORITY};
pub use watchlist::{
    load_watchlist, parse_watchlist, CategoryConfig, InventoryLink, ProductConfig, Watchlist,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read watchlist file {path}: {source}")]
    WatchlistIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse watchlist YAML: {0}")]
    WatchlistParse(#[source] serde_yaml::Error),

    #[error("watchlist validation failed: {0}")]
    Validation(String),
}
