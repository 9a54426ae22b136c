use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode, Url};

use super::{FetchedPage, PageFetcher};
use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;

const BROWSER_FALLBACK_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_RU: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// Markers that only ever appear on interstitial challenge pages.
const CHALLENGE_MARKERS: &[&str] = &[
    "/cdn-cgi/challenge-platform/",
    "cf-chl-",
    "attention required! | cloudflare",
    "checking your browser",
    "ddos-guard",
    "smartcaptcha",
    "access denied",
];

/// Real product pages embed captcha widgets too, so a bare "captcha" only
/// counts on pages this small.
const WEAK_MARKER_MAX_BYTES: usize = 16 * 1024;

/// Returns the marker that identifies `body` as an anti-bot challenge page.
#[must_use]
pub fn looks_like_bot_challenge(body: &str) -> Option<&'static str> {
    let lowered = body.to_lowercase();
    if let Some(marker) = CHALLENGE_MARKERS
        .iter()
        .copied()
        .find(|m| lowered.contains(m))
    {
        return Some(marker);
    }
    let just_a_moment = lowered.contains("just a moment...") && lowered.contains("cloudflare");
    if just_a_moment {
        return Some("just a moment...");
    }
    if body.len() <= WEAK_MARKER_MAX_BYTES && lowered.contains("captcha") {
        return Some("captcha");
    }
    None
}

/// Plain HTTP fetcher with browser-like headers.
///
/// Attempts alternate between the configured `User-Agent` and a desktop
/// Chrome string; transient failures (timeouts, 5xx, 429, challenge pages)
/// are retried with exponential back-off.
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            user_agent: user_agent.to_owned(),
            max_retries,
            backoff_base_secs,
        })
    }

    fn user_agent_for(&self, attempt: u32) -> &str {
        if attempt % 2 == 1 && self.user_agent != BROWSER_FALLBACK_UA {
            BROWSER_FALLBACK_UA
        } else {
            &self.user_agent
        }
    }

    async fn fetch_once(&self, url: &str, attempt: u32) -> Result<FetchedPage, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent_for(attempt))
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_RU)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited {
                domain: extract_domain(url),
                retry_after_secs,
            });
        }
        if status == StatusCode::FORBIDDEN {
            return Err(ScraperError::Blocked {
                url: url.to_owned(),
                reason: "HTTP 403".to_owned(),
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        if let Some(marker) = looks_like_bot_challenge(&body) {
            tracing::warn!(url, attempt, marker, "anti-bot challenge page served");
            return Err(ScraperError::Blocked {
                url: url.to_owned(),
                reason: format!("challenge marker \"{marker}\""),
            });
        }

        tracing::debug!(url, attempt, bytes = body.len(), "fetched page");
        Ok(FetchedPage::new(url, body))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        let parsed = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScraperError::InvalidUrl {
                url: url.to_owned(),
                reason: format!("unsupported scheme \"{}\"", parsed.scheme()),
            });
        }

        retry_with_backoff(self.max_retries, self.backoff_base_secs, |attempt| {
            self.fetch_once(url, attempt)
        })
        .await
    }
}

fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloudflare_interstitial_is_detected() {
        let body = r#"<html><head><title>Just a moment...</title></head>
            <body><script src="/cdn-cgi/challenge-platform/h/b/orchestrate/jsch/v1"></script></body></html>"#;
        assert_eq!(
            looks_like_bot_challenge(body),
            Some("/cdn-cgi/challenge-platform/")
        );
    }

    #[test]
    fn small_captcha_page_is_detected() {
        let body = "<html><body><form id='captcha'>Подтвердите, что вы не робот</form></body></html>";
        assert_eq!(looks_like_bot_challenge(body), Some("captcha"));
    }

    #[test]
    fn large_page_with_recaptcha_widget_is_not_a_challenge() {
        let filler = "<p>Фанера березовая</p>".repeat(2_000);
        let body = format!("<html><body>{filler}<div class='g-recaptcha'></div></body></html>");
        assert_eq!(looks_like_bot_challenge(&body), None);
    }

    #[test]
    fn ordinary_product_page_passes() {
        let body = "<html><body><h1>Фанера</h1><span class='price'>1 790 ₽</span></body></html>";
        assert_eq!(looks_like_bot_challenge(body), None);
    }

    #[test]
    fn user_agent_alternates_on_retries() {
        let fetcher = HttpFetcher::new(5, "pricewatch-test/0.1", 0, 0).unwrap();
        assert_eq!(fetcher.user_agent_for(0), "pricewatch-test/0.1");
        assert_eq!(fetcher.user_agent_for(1), BROWSER_FALLBACK_UA);
        assert_eq!(fetcher.user_agent_for(2), "pricewatch-test/0.1");
    }

    #[test]
    fn domain_extraction() {
        assert_eq!(extract_domain("https://moscow.petrovich.ru/p/1"), "moscow.petrovich.ru");
        assert_eq!(extract_domain("not a url"), "not a url");
    }
}
