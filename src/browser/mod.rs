//! Browser seam: navigation, bounded waits and DOM snapshots.
//!
//! Stages only talk to the `Browser` trait. A wait hands back a `Page`, an
//! owned snapshot of the document taken at the moment the awaited element was
//! present, so extraction runs synchronously on parsed HTML.

#[cfg(feature = "chrome")]
pub mod chrome;
#[cfg(test)]
pub mod fixture;
pub mod http;

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("navigation to {url} timed out after {waited:?}")]
    NavigationTimeout { url: String, waited: Duration },
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("timed out after {waited:?} waiting for `{selector}` on {url}")]
    WaitTimeout {
        selector: String,
        url: String,
        waited: Duration,
    },
    #[error("no page loaded")]
    NoPage,
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("browser driver error: {0}")]
    Driver(String),
}

impl BrowserError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            BrowserError::NavigationTimeout { .. } | BrowserError::WaitTimeout { .. }
        )
    }
}

/// A compiled CSS selector that remembers its source text for error messages.
#[derive(Debug, Clone)]
pub struct Locator {
    css: String,
    selector: Selector,
}

impl Locator {
    pub fn parse(css: &str) -> Result<Self, BrowserError> {
        let selector = Selector::parse(css).map_err(|e| BrowserError::InvalidSelector {
            selector: css.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Locator {
            css: css.to_string(),
            selector,
        })
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// DOM snapshot of the page the browser was on when a wait succeeded.
#[derive(Debug)]
pub struct Page {
    url: Url,
    document: Html,
}

impl Page {
    pub fn parse(url: Url, html: &str) -> Self {
        Page {
            url,
            document: Html::parse_document(html),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn contains(&self, locator: &Locator) -> bool {
        self.document.select(locator.selector()).next().is_some()
    }

    pub fn select<'a>(&'a self, locator: &'a Locator) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.document.select(locator.selector())
    }

    pub fn first<'a>(&'a self, locator: &Locator) -> Option<ElementRef<'a>> {
        self.document.select(locator.selector()).next()
    }

    /// Absolute URL of an element's `href`, resolved against this page.
    pub fn href(&self, element: ElementRef<'_>) -> Option<String> {
        let raw = element.value().attr("href")?.trim();
        if raw.is_empty() {
            return None;
        }
        self.url.join(raw).ok().map(String::from)
    }
}

/// Visible text of an element with whitespace runs collapsed.
pub fn text_of(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    WS_RE.replace_all(&raw, " ").trim().to_string()
}

pub fn first_in<'a>(element: ElementRef<'a>, locator: &Locator) -> Option<ElementRef<'a>> {
    element.select(locator.selector()).next()
}

#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Load `url` into the session. Fails on timeout or a non-success load.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Block until at least one element matches `locator` on the current page,
    /// or `timeout` elapses.
    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<Page, BrowserError>;

    async fn close(self) -> Result<(), BrowserError>;
}
