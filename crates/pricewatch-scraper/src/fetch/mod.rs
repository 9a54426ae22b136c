//! The page fetcher capability.
//!
//! Extraction never talks to the network directly; it is handed a
//! [`PageFetcher`] at construction time. [`HttpFetcher`] is the production
//! implementation, [`StaticFetcher`] serves canned pages.

mod http;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ScraperError;

pub use http::{looks_like_bot_challenge, HttpFetcher};

/// Raw content for one URL: the HTML plus any JSON bodies captured while the
/// page loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
    pub network_bodies: Vec<String>,
}

impl FetchedPage {
    #[must_use]
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            network_bodies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_network_bodies(mut self, bodies: Vec<String>) -> Self {
        self.network_bodies = bodies;
        self
    }
}

/// Fetches raw page content.
///
/// Implementations must report anti-bot interstitials as
/// [`ScraperError::Blocked`] rather than returning the challenge HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScraperError>;
}

/// Serves pages from memory, keyed by URL. Unknown URLs are
/// [`ScraperError::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, FetchedPage>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, page: FetchedPage) -> Self {
        self.insert(page);
        self
    }

    pub fn insert(&mut self, page: FetchedPage) {
        self.pages.insert(page.url.clone(), page);
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::NotFound {
                url: url.to_owned(),
            })
    }
}
