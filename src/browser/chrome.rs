//! Headless Chromium session for pages that only render their tables client-side.

use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser as Chromium, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use super::{Browser, BrowserError, Locator, Page};

pub struct ChromeBrowser {
    browser: Chromium,
    page: chromiumoxide::Page,
    handler: JoinHandle<()>,
    poll_interval: Duration,
    page_load_timeout: Duration,
    current: Option<Url>,
}

fn driver_err(e: impl std::fmt::Display) -> BrowserError {
    BrowserError::Driver(e.to_string())
}

impl ChromeBrowser {
    pub async fn launch(
        page_load_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, BrowserError> {
        let config = BrowserConfig::builder()
            .request_timeout(page_load_timeout)
            .build()
            .map_err(driver_err)?;
        let (browser, mut events) = Chromium::launch(config).await.map_err(driver_err)?;

        // The CDP event loop must be polled for any command to complete.
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(driver_err)?;
        Ok(ChromeBrowser {
            browser,
            page,
            handler,
            poll_interval,
            page_load_timeout,
            current: None,
        })
    }

    async fn snapshot(&self, url: &Url) -> Result<Page, BrowserError> {
        let html = self.page.content().await.map_err(driver_err)?;
        Ok(Page::parse(url.clone(), &html))
    }
}

impl Browser for ChromeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.current = None;
        let target = Url::parse(url).map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match tokio::time::timeout(self.page_load_timeout, self.page.goto(url)).await {
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                waited: self.page_load_timeout,
            }),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Ok(Ok(_)) => {
                let landed = self
                    .page
                    .url()
                    .await
                    .ok()
                    .flatten()
                    .and_then(|u| Url::parse(&u).ok())
                    .unwrap_or(target);
                self.current = Some(landed);
                Ok(())
            }
        }
    }

    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<Page, BrowserError> {
        let url = self.current.clone().ok_or(BrowserError::NoPage)?;
        let deadline = Instant::now() + timeout;
        loop {
            let page = self.snapshot(&url).await?;
            if page.contains(locator) {
                return Ok(page);
            }
            drop(page);

            let now = Instant::now();
            if now >= deadline {
                return Err(BrowserError::WaitTimeout {
                    selector: locator.css().to_string(),
                    url: url.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn close(mut self) -> Result<(), BrowserError> {
        let closed = self.browser.close().await.map(|_| ()).map_err(driver_err);
        if let Err(e) = self.browser.wait().await {
            warn!("Chromium did not exit cleanly: {}", e);
        }
        self.handler.abort();
        debug!("Chromium session closed");
        closed
    }
}
