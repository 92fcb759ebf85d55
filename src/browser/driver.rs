use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// How an element is located on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    /// W3C WebDriver location strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Opaque reference to an element inside one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Browser capabilities the claim core relies on. One instance owns one
/// browser session; it is never shared between accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>>;

    /// First descendant of `parent` matching `locator`, if any.
    async fn find_child(&self, parent: &ElementRef, locator: &Locator) -> Result<Option<ElementRef>>;

    async fn element_text(&self, element: &ElementRef) -> Result<String>;

    /// Waits until an element matching `locator` is present.
    async fn wait_for_element(&self, locator: &Locator, timeout: Duration) -> Result<ElementRef>;

    /// Waits until an element matching `locator` is displayed and enabled.
    async fn wait_for_clickable(&self, locator: &Locator, timeout: Duration) -> Result<ElementRef>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn clear_and_type(&self, element: &ElementRef, text: &str) -> Result<()>;

    async fn scroll_to_bottom(&self) -> Result<()>;

    async fn read_page_text(&self) -> Result<String>;

    async fn quit(&self) -> Result<()>;
}

/// Opens a fresh browser session for each account.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>>;
}
