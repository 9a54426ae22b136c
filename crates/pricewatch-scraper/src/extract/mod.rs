//! Price candidate extraction.
//!
//! A fetched page is parsed once into a [`ParsedPage`]; [`ParsedPage::candidates`]
//! then runs the strategy battery lazily, one stage at a time, in trust
//! order:
//!
//! 1. structured data (JSON-LD `Product` / `Offer`)
//! 2. price meta tags
//! 3. the site's known "current price" selectors
//! 4. JSON embedded in inline scripts
//! 5. captured network bodies, only when 1-4 found nothing
//! 6. a generic `data-*price` / `[class*=price]` scan, only when everything
//!    above found nothing
//!
//! Stage failures (a selector matching nothing, a script that is not JSON)
//! simply produce no candidates; the next stage runs.

mod dom;
mod meta;
mod script;
pub(crate) mod structured;

use std::collections::VecDeque;

use scraper::{Html, Selector};
use serde_json::Value;

use crate::candidate::{PriceCandidate, Strategy};
use crate::fetch::FetchedPage;
use crate::json_scan::{parse_json_blocks, parse_json_document};
use crate::sites::SiteProfile;

/// Scripts are only scanned for JSON when they mention one of these.
const DEFAULT_SCRIPT_MARKERS: &[&str] = &["price", "цена"];

const STAGES: [Strategy; 6] = [
    Strategy::StructuredData,
    Strategy::MetaTag,
    Strategy::DomSelector,
    Strategy::InlineScript,
    Strategy::NetworkResponse,
    Strategy::HtmlAttribute,
];

/// A page parsed once: the DOM plus every JSON payload recovered from it.
pub struct ParsedPage {
    url: String,
    document: Html,
    structured: Vec<Value>,
    scripts: Vec<Value>,
    network: Vec<Value>,
}

impl ParsedPage {
    /// Parses `page` for `profile`. Inline scripts are kept when they mention
    /// a price marker or one of the site's product JSON keys.
    #[must_use]
    pub fn parse(page: &FetchedPage, profile: &SiteProfile) -> Self {
        let document = Html::parse_document(&page.html);

        let mut structured = Vec::new();
        let mut scripts = Vec::new();
        let script_sel = selector("script");
        for node in document.select(&script_sel) {
            if node.value().attr("src").is_some() {
                continue;
            }
            let text: String = node.text().collect();
            let kind = node
                .value()
                .attr("type")
                .unwrap_or_default()
                .to_ascii_lowercase();
            if kind.contains("ld+json") {
                if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
                    structured.push(value);
                }
                continue;
            }
            if mentions_marker(&text, profile) {
                scripts.extend(parse_json_blocks(&text));
            }
        }

        let network = page
            .network_bodies
            .iter()
            .flat_map(|body| parse_json_document(body))
            .collect();

        Self {
            url: page.url.clone(),
            document,
            structured,
            scripts,
            network,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Decoded `application/ld+json` blocks, as written on the page.
    #[must_use]
    pub fn structured_data(&self) -> &[Value] {
        &self.structured
    }

    /// JSON recovered from inline scripts.
    #[must_use]
    pub fn script_data(&self) -> &[Value] {
        &self.scripts
    }

    /// JSON recovered from captured network responses.
    #[must_use]
    pub fn network_data(&self) -> &[Value] {
        &self.network
    }

    /// Lazy candidate sequence for this page. One pass only; call again to
    /// restart from the first stage.
    #[must_use]
    pub fn candidates<'p>(&'p self, profile: &'p SiteProfile) -> Candidates<'p> {
        Candidates {
            page: self,
            profile,
            next_stage: 0,
            buffer: VecDeque::new(),
            yielded: 0,
        }
    }
}

/// Iterator returned by [`ParsedPage::candidates`].
pub struct Candidates<'p> {
    page: &'p ParsedPage,
    profile: &'p SiteProfile,
    next_stage: usize,
    buffer: VecDeque<PriceCandidate>,
    yielded: usize,
}

impl Iterator for Candidates<'_> {
    type Item = PriceCandidate;

    fn next(&mut self) -> Option<PriceCandidate> {
        loop {
            if let Some(candidate) = self.buffer.pop_front() {
                self.yielded += 1;
                return Some(candidate);
            }

            let stage = *STAGES.get(self.next_stage)?;
            self.next_stage += 1;

            let fallback_only = matches!(
                stage,
                Strategy::NetworkResponse | Strategy::HtmlAttribute
            );
            if fallback_only && self.yielded > 0 {
                continue;
            }

            let found = run_stage(stage, self.page, self.profile);
            tracing::debug!(
                url = %self.page.url,
                strategy = %stage,
                found = found.len(),
                "price extraction stage finished"
            );
            self.buffer
                .extend(found.into_iter().filter(PriceCandidate::is_plausible));
        }
    }
}

fn run_stage(stage: Strategy, page: &ParsedPage, profile: &SiteProfile) -> Vec<PriceCandidate> {
    match stage {
        Strategy::StructuredData => structured::structured_candidates(page.structured_data()),
        Strategy::MetaTag => meta::meta_candidates(page.document()),
        Strategy::DomSelector => dom::selector_candidates(page.document(), profile.price_selectors),
        Strategy::InlineScript => {
            script::json_candidates(page.script_data(), Strategy::InlineScript, "script")
        }
        Strategy::NetworkResponse => {
            script::json_candidates(page.network_data(), Strategy::NetworkResponse, "network")
        }
        Strategy::HtmlAttribute => dom::attribute_candidates(page.document()),
    }
}

fn mentions_marker(text: &str, profile: &SiteProfile) -> bool {
    let lowered = text.to_lowercase();
    DEFAULT_SCRIPT_MARKERS
        .iter()
        .chain(profile.script_markers)
        .chain(profile.product_json_keys)
        .any(|marker| lowered.contains(&marker.to_lowercase()))
}

/// Parses one of this crate's own selector literals.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid built-in CSS selector")
}
