use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use log::{debug, info};
use reqwest::Client;

use crate::error::FetchError;

// Some sites reject requests carrying a default client identifier.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

// Bounds for the rendered-mode settle heuristic.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(250);
const SETTLE_STABLE_POLLS: u32 = 3;

/// Page fetcher with two variants behind one `fetch` contract, so the
/// extractor never knows which mode produced the document.
pub enum Fetcher {
    Direct(DirectFetcher),
    Rendered(RenderedFetcher),
}

impl Fetcher {
    pub fn from_mode(rendered: bool) -> Result<Self, FetchError> {
        if rendered {
            Ok(Self::Rendered(RenderedFetcher))
        } else {
            Ok(Self::Direct(DirectFetcher::new()?))
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        match self {
            Self::Direct(fetcher) => fetcher.fetch(url).await,
            Self::Rendered(fetcher) => fetcher.fetch(url).await,
        }
    }
}

/// Plain HTTP GET of the page markup.
pub struct DirectFetcher {
    client: Client,
}

impl DirectFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!("fetching {url} via HTTP GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}

/// Fetches the page through headless Chromium so client-side rendering runs
/// before the DOM is captured.
pub struct RenderedFetcher;

impl RenderedFetcher {
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!("fetching {url} via headless Chromium");

        let config = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(FetchError::Browser)?;

        let (mut browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        // The browser process must be torn down on every exit path, so the
        // fallible navigation/capture work happens behind this call and its
        // result is only propagated after cleanup.
        let html = Self::capture(&browser, url).await;

        let _ = browser.close().await;
        let _ = browser.wait().await;
        handler_task.abort();

        html
    }

    async fn capture(browser: &Browser, url: &str) -> Result<String, FetchError> {
        let page = tokio::time::timeout(PAGE_LOAD_TIMEOUT, browser.new_page(url))
            .await
            .map_err(|_| {
                FetchError::Browser(format!(
                    "navigation to {url} timed out after {PAGE_LOAD_TIMEOUT:?}"
                ))
            })?
            .map_err(browser_err)?;

        page.wait_for_navigation().await.map_err(browser_err)?;
        Self::wait_until_settled(&page).await?;

        page.content().await.map_err(browser_err)
    }

    /// Bounded idle heuristic: the render is treated as settled once the
    /// serialized DOM stops changing size for a few consecutive polls, or the
    /// deadline passes, whichever comes first.
    async fn wait_until_settled(page: &Page) -> Result<(), FetchError> {
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        let mut last_len = 0usize;
        let mut stable_polls = 0u32;

        while stable_polls < SETTLE_STABLE_POLLS && Instant::now() < deadline {
            tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
            let len = page.content().await.map_err(browser_err)?.len();
            if len == last_len {
                stable_polls += 1;
            } else {
                debug!("render not settled yet ({last_len} -> {len} bytes)");
                stable_polls = 0;
                last_len = len;
            }
        }

        Ok(())
    }
}

fn browser_err(err: chromiumoxide::error::CdpError) -> FetchError {
    FetchError::Browser(err.to_string())
}
