use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::{Browser, BrowserError, Locator, Page};

/// In-memory session serving fixed HTML per URL. Unknown URLs fail navigation
/// as a timeout; waits for absent elements fail immediately.
#[derive(Default)]
pub struct StaticBrowser {
    pages: HashMap<String, String>,
    current: Option<String>,
    closes: Arc<AtomicUsize>,
}

impl StaticBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn fixture(self, url: &str, name: &str) -> Self {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        self.page(url, &html)
    }

    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

impl Browser for StaticBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.pages.contains_key(url) {
            self.current = Some(url.to_string());
            Ok(())
        } else {
            self.current = None;
            Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                waited: Duration::ZERO,
            })
        }
    }

    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<Page, BrowserError> {
        let url = self.current.as_ref().ok_or(BrowserError::NoPage)?;
        let page = Page::parse(Url::parse(url).unwrap(), &self.pages[url]);
        if page.contains(locator) {
            Ok(page)
        } else {
            Err(BrowserError::WaitTimeout {
                selector: locator.css().to_string(),
                url: url.clone(),
                waited: timeout,
            })
        }
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
