use std::future::Future;

use crate::error::AppError;
use crate::models::{RawJobRecord, SiteConfig};

/// Lightweight HTTP strategy: fetches a page and returns its HTML once it
/// has passed the substantive-content checks.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Headless-browser strategy: renders a page and returns the resulting DOM.
///
/// Implementations own a browser process that is launched lazily by the
/// first `render` and torn down by `release`. Only the aggregator calls
/// `release`; it must be safe to call more than once.
pub trait Renderer: Send + Sync + Clone {
    fn render(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;

    fn release(&self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Extracts raw listings from an HTML page.
pub trait JobParser: Send + Sync + Clone {
    fn parse(&self, html: &str, site: &SiteConfig) -> Vec<RawJobRecord>;
}

/// A renderer for deployments without a browser.
#[derive(Debug, Clone, Default)]
pub struct DisabledRenderer;

impl Renderer for DisabledRenderer {
    async fn render(&self, url: &str) -> Result<String, AppError> {
        Err(AppError::BrowserError(format!(
            "browser rendering is disabled, cannot render {url}"
        )))
    }

    async fn release(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_renderer_always_fails() {
        let renderer = DisabledRenderer;
        let err = renderer.render("https://acme.test").await.unwrap_err();
        assert!(matches!(err, AppError::BrowserError(_)));
        assert!(renderer.release().await.is_ok());
    }
}
