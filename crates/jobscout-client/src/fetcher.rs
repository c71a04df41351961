use std::time::Duration;

use jobscout_core::config::ScraperConfig;
use jobscout_core::error::AppError;
use jobscout_core::traits::Fetcher;
use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, redirect};

use crate::parser::visible_text_len;

const MAX_REDIRECTS: usize = 5;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Desktop browser identities rotated per request.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.8,de;q=0.5",
    "en-CA,en;q=0.9,fr;q=0.4",
];

/// Plain HTTP strategy using reqwest.
///
/// Each request picks a random user agent and accept-language from fixed
/// pools, follows at most five redirects, and rejects pages that are too
/// small or carry too little visible text to hold listings.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
    min_html_length: usize,
    min_text_length: usize,
}

impl ReqwestFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| AppError::HttpError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout.as_secs(),
            min_html_length: config.min_html_length,
            min_text_length: config.min_text_length,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let (user_agent, language) = pick_identity();

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT_LANGUAGE, language)
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else if e.is_redirect() {
                    AppError::HttpError(format!("Too many redirects for {url}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {url}",
                status.as_u16()
            )));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::HttpError(format!("Failed to read response body: {e}"))
            }
        })?;

        check_content(&body, self.min_html_length, self.min_text_length)?;
        tracing::debug!(url, bytes = body.len(), "Fetched page over HTTP");
        Ok(body)
    }
}

fn pick_identity() -> (&'static str, &'static str) {
    let mut rng = rand::rng();
    (
        USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0]),
        ACCEPT_LANGUAGES
            .choose(&mut rng)
            .copied()
            .unwrap_or(ACCEPT_LANGUAGES[0]),
    )
}

/// Reject pages too short to be a listing page.
///
/// Both the raw markup and the visible body text must meet their minimums.
pub fn check_content(html: &str, min_html: usize, min_text: usize) -> Result<(), AppError> {
    if html.len() < min_html {
        return Err(AppError::InsufficientContent {
            length: html.len(),
            minimum: min_html,
        });
    }
    let text = visible_text_len(html);
    if text < min_text {
        return Err(AppError::InsufficientContent {
            length: text,
            minimum: min_text,
        });
    }
    Ok(())
}
