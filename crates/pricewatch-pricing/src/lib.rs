//! Pricing rule engine for pricewatch.
//!
//! Turns a confirmed competitor price into one target price per inventory
//! price type, and caches the price-type names the inventory system knows.

pub mod engine;
pub mod error;
pub mod price_types;

pub use engine::{apply_pricing_rules, merge_rules, round_half_up, rule_from_parts};
pub use error::PricingError;
pub use price_types::{PriceTypeCache, PriceTypeSource};
