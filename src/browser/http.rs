use std::time::{Duration, Instant};

use tracing::{debug, trace};
use url::Url;

use super::{Browser, BrowserError, Locator, Page};

/// Plain HTTP session: `navigate` fetches the document, `wait_for` re-fetches
/// it with a doubling interval until the awaited element shows up. A re-fetch
/// that returns the same document ends the wait early, and no re-fetch outlives
/// the wait deadline.
pub struct HttpBrowser {
    client: reqwest::Client,
    poll_interval: Duration,
    page_load_timeout: Duration,
    current: Option<Loaded>,
}

struct Loaded {
    url: Url,
    body: String,
}

impl HttpBrowser {
    pub fn new(
        user_agent: &str,
        page_load_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, BrowserError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(page_load_timeout)
            .gzip(true)
            .build()
            .map_err(|e| BrowserError::Driver(e.to_string()))?;
        Ok(HttpBrowser {
            client,
            poll_interval,
            page_load_timeout,
            current: None,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Loaded, BrowserError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await.map_err(|e| self.load_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrowserError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| self.load_error(url, e))?;
        trace!(
            "Fetched {} ({} bytes) in {}ms",
            final_url,
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(Loaded { url: final_url, body })
    }

    fn load_error(&self, url: &str, e: reqwest::Error) -> BrowserError {
        if e.is_timeout() {
            BrowserError::NavigationTimeout {
                url: url.to_string(),
                waited: self.page_load_timeout,
            }
        } else {
            BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

fn wait_timeout(locator: &Locator, url: String, waited: Duration) -> BrowserError {
    BrowserError::WaitTimeout {
        selector: locator.css().to_string(),
        url,
        waited,
    }
}

impl Browser for HttpBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        // A failed load leaves no current page, so a later wait cannot match stale HTML.
        self.current = None;
        self.current = Some(self.fetch(url).await?);
        Ok(())
    }

    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<Page, BrowserError> {
        let start = Instant::now();
        let deadline = start + timeout;
        let mut interval = self.poll_interval;
        loop {
            let loaded = self.current.as_ref().ok_or(BrowserError::NoPage)?;
            let page = Page::parse(loaded.url.clone(), &loaded.body);
            if page.contains(locator) {
                return Ok(page);
            }
            drop(page);

            let url = loaded.url.to_string();
            let now = Instant::now();
            if now >= deadline {
                return Err(wait_timeout(locator, url, start.elapsed()));
            }

            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = interval.saturating_mul(2);
            debug!("Re-fetching {} while waiting for `{}`", url, locator.css());

            let left = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(left, self.fetch(&url)).await {
                Err(_) => return Err(wait_timeout(locator, url, start.elapsed())),
                // Served HTML that did not change will not grow the element later.
                Ok(Ok(fresh)) if self.current.as_ref().is_some_and(|c| c.body == fresh.body) => {
                    return Err(wait_timeout(locator, url, start.elapsed()));
                }
                Ok(Ok(fresh)) => self.current = Some(fresh),
                // Keep the last good snapshot; the deadline decides when to give up.
                Ok(Err(e)) => debug!("Re-fetch of {} failed: {}", url, e),
            }
        }
    }

    async fn close(self) -> Result<(), BrowserError> {
        debug!("HTTP session closed");
        Ok(())
    }
}
