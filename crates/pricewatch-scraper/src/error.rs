use pricewatch_core::SnapshotError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("anti-bot challenge served by {url}: {reason}")]
    Blocked { url: String, reason: String },

    #[error("fetch of {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unknown site adapter \"{name}\"")]
    UnknownAdapter { name: String },

    #[error("price not found on {url}: {reason}")]
    PriceNotFound { url: String, reason: String },

    #[error("invalid product snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

impl ScraperError {
    /// The page loaded but no plausible price could be recovered from it.
    ///
    /// Operators fix these by updating the adapter's selectors rather than by
    /// waiting and retrying.
    #[must_use]
    pub fn is_price_not_found(&self) -> bool {
        matches!(self, ScraperError::PriceNotFound { .. })
    }

    /// The site was unreachable, slow, or blocking us. A later attempt may
    /// succeed without any code change.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            ScraperError::RateLimited { .. }
            | ScraperError::Blocked { .. }
            | ScraperError::Timeout { .. } => true,
            ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
            ScraperError::NotFound { .. }
            | ScraperError::InvalidUrl { .. }
            | ScraperError::UnknownAdapter { .. }
            | ScraperError::PriceNotFound { .. }
            | ScraperError::Snapshot(_) => false,
        }
    }
}
