use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use jobscout_core::config::ScraperConfig;
use jobscout_core::error::AppError;
use jobscout_core::traits::Renderer;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Selectors that suggest the listing markup has been rendered.
const JOB_CONTAINER_HINTS: &[&str] = &[
    "[class*='job']",
    "[class*='position']",
    "[class*='opening']",
    "[role='listitem']",
];

const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Launched browser plus the task driving its CDP connection.
struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Headless Chromium strategy for script-rendered career pages.
///
/// The browser is launched on the first [`Renderer::render`] and shared by
/// all clones; [`Renderer::release`] shuts it down. A render after release
/// launches a fresh browser. Every render runs in its own browser context,
/// which is disposed afterwards whatever the outcome.
#[derive(Clone)]
pub struct ChromiumRenderer {
    session: Arc<RwLock<Option<Session>>>,
    navigation_timeout: Duration,
    settle_delay: Duration,
    selector_timeout: Duration,
    min_html_length: usize,
}

impl ChromiumRenderer {
    /// Does not launch anything until the first render.
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            navigation_timeout: config.browser_timeout,
            settle_delay: config.settle_delay,
            selector_timeout: config.selector_timeout,
            min_html_length: config.min_html_length,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.session.read().await.is_some()
    }

    async fn ensure_launched(&self) -> Result<(), AppError> {
        if self.session.read().await.is_some() {
            return Ok(());
        }
        let mut guard = self.session.write().await;
        if guard.is_none() {
            *guard = Some(launch().await?);
        }
        Ok(())
    }

    async fn render_in_context(
        &self,
        browser: &Browser,
        context_id: &BrowserContextId,
        url: &str,
    ) -> Result<String, AppError> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(|e| AppError::BrowserError(format!("Invalid target params: {e}")))?;
        let page = browser
            .new_page(target)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to open page: {e}")))?;

        let outcome = self.capture(&page, url).await;

        if let Err(e) = page.close().await {
            tracing::warn!(url, "Failed to close page: {e}");
        }
        outcome
    }

    async fn capture(&self, page: &Page, url: &str) -> Result<String, AppError> {
        tokio::time::timeout(self.navigation_timeout, async {
            page.goto(url)
                .await
                .map_err(|e| AppError::BrowserError(format!("Failed to navigate to {url}: {e}")))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| AppError::BrowserError(format!("Navigation did not settle: {e}")))?;
            Ok::<(), AppError>(())
        })
        .await
        .map_err(|_| AppError::Timeout(self.navigation_timeout.as_secs()))??;

        tokio::time::sleep(self.settle_delay).await;

        match wait_for_listings(page, self.selector_timeout).await {
            Some(selector) => tracing::debug!(url, selector, "Listing markup present"),
            None => tracing::debug!(url, "No listing markup appeared; capturing anyway"),
        }

        let html = page
            .content()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))?;

        if html.len() < self.min_html_length {
            return Err(AppError::InsufficientContent {
                length: html.len(),
                minimum: self.min_html_length,
            });
        }
        Ok(html)
    }
}

impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<String, AppError> {
        self.ensure_launched().await?;

        let guard = self.session.read().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| AppError::BrowserError("Browser was released mid-render".into()))?;
        let browser = &session.browser;

        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to create browser context: {e}")))?
            .result
            .browser_context_id;

        let outcome = self.render_in_context(browser, &context_id, url).await;

        if let Err(e) = browser
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
        {
            tracing::warn!(url, "Failed to dispose browser context: {e}");
        }

        let html = outcome?;
        tracing::debug!(url, bytes = html.len(), "Rendered page in browser");
        Ok(html)
    }

    async fn release(&self) -> Result<(), AppError> {
        let Some(mut session) = self.session.write().await.take() else {
            return Ok(());
        };

        let closed = session
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| AppError::BrowserError(format!("Failed to close browser: {e}")));
        if let Err(e) = session.browser.wait().await {
            tracing::warn!("Browser process did not exit cleanly: {e}");
        }
        session.handler.abort();

        tracing::info!("Headless browser released");
        closed
    }
}

/// Tries each job-container hint in order, giving each `per_selector` to
/// attach. Returns the first that does.
async fn wait_for_listings(page: &Page, per_selector: Duration) -> Option<&'static str> {
    for selector in JOB_CONTAINER_HINTS.iter().copied() {
        if tokio::time::timeout(per_selector, wait_for_selector(page, selector))
            .await
            .is_ok()
        {
            return Some(selector);
        }
    }
    None
}

async fn wait_for_selector(page: &Page, selector: &str) {
    while page.find_element(selector).await.is_err() {
        tokio::time::sleep(SELECTOR_POLL).await;
    }
}

async fn launch() -> Result<Session, AppError> {
    let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();
    if let Some(bin) = chrome_binary() {
        tracing::info!("Using Chrome binary: {}", bin.display());
        builder = builder.chrome_executable(bin);
    }

    let config = builder
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--no-first-run")
        .build()
        .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

    // The CDP connection only makes progress while the handler is polled.
    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::warn!("Browser CDP handler error: {e}");
                break;
            }
        }
    });

    tracing::info!("Launched headless browser");
    Ok(Session { browser, handler })
}

/// `JOBSCOUT_CHROME_BIN`, else the first well-known install that exists.
///
/// Snap's `/snap/bin/chromium` wrapper drops headless flags, so the binary
/// inside the snap is preferred. `None` leaves the lookup to chromiumoxide.
fn chrome_binary() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    ];

    std::env::var_os("JOBSCOUT_CHROME_BIN")
        .map(PathBuf::from)
        .into_iter()
        .chain(CANDIDATES.iter().map(PathBuf::from))
        .find(|p| p.exists())
}
