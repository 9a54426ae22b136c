//! Competitor price extraction.
//!
//! [`ScraperService`] is the entry point: it fetches a page through an
//! injected [`PageFetcher`], runs the site adapter's strategy battery to
//! collect [`PriceCandidate`]s, and disambiguates them into a single
//! [`ProductSnapshot`](pricewatch_core::ProductSnapshot).

pub mod candidate;
pub mod disambiguate;
pub mod error;
pub mod extract;
pub mod fetch;
mod hints;
mod json_scan;
mod json_walk;
pub mod normalize;
pub(crate) mod rate_limit;
pub mod service;
pub mod sites;
pub mod variants;

pub use candidate::{PriceCandidate, Strategy};
pub use disambiguate::{score_candidate, select_price, SelectionPolicy};
pub use error::ScraperError;
pub use extract::{Candidates, ParsedPage};
pub use fetch::{looks_like_bot_challenge, FetchedPage, HttpFetcher, PageFetcher, StaticFetcher};
pub use normalize::{decimal_from_json, detect_currency, normalize_price, round_price, PriceParseError};
pub use service::{ProductRequest, ScraperService, ServiceOptions};
pub use sites::{CategoryProfile, SiteAdapter, SiteProfile};
pub use variants::{build_variant_key, collect_variants, select_variant, VariantOption};
