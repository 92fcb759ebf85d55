use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{
    browser::{
        driver::{BrowserDriver, DriverFactory, ElementRef, Locator},
        engine::{BrowserEngine, LaunchOptions},
    },
    error::{ClaimError, Result},
};

/// Key under which W3C WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const PAGE_TEXT_SCRIPT: &str = "return document.body ? document.body.innerText : '';";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Speaks the W3C WebDriver HTTP protocol to chromedriver, geckodriver or
/// msedgedriver.
pub struct WebDriverClient {
    http: Client,
    base_url: String,
    session_id: String,
    poll_interval: Duration,
}

impl WebDriverClient {
    /// Opens a new browser session on the WebDriver server.
    pub async fn connect(webdriver_url: &str, engine: BrowserEngine, options: &LaunchOptions) -> Result<Self> {
        let http = Client::new();
        let base_url = webdriver_url.trim_end_matches('/').to_string();

        info!("Starting {} session via {}", engine, base_url);

        let response = http
            .post(format!("{}/session", base_url))
            .json(&engine.capabilities(options))
            .send()
            .await?;
        let value = Self::unwrap_response(response).await?;

        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| ClaimError::BrowserUnavailable(format!(
                "{} returned no session id",
                base_url
            )))?
            .to_string();

        debug!("WebDriver session {} created", session_id);

        Ok(Self {
            http,
            base_url,
            session_id,
            poll_interval: Duration::from_millis(500),
        })
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let mut request = self.http.request(method, self.session_url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        Self::unwrap_response(response).await
    }

    /// Extracts `value` from a WebDriver response, turning protocol errors
    /// into `ClaimError::WebDriver`.
    async fn unwrap_response(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let mut body: Value = response.json().await?;
        let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Err(ClaimError::WebDriver {
                error: error.to_string(),
                message: value["message"].as_str().unwrap_or_default().to_string(),
            });
        }

        if !status.is_success() {
            return Err(ClaimError::WebDriver {
                error: format!("http {}", status.as_u16()),
                message: value.to_string(),
            });
        }

        Ok(value)
    }

    fn parse_elements(value: &Value) -> Vec<ElementRef> {
        value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item[ELEMENT_KEY].as_str())
                    .map(|id| ElementRef(id.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn locator_body(locator: &Locator) -> Value {
        json!({ "using": locator.strategy(), "value": locator.value() })
    }

    async fn element_flag(&self, element: &ElementRef, flag: &str) -> Result<bool> {
        let value = self
            .command(Method::GET, &format!("/element/{}/{}", element.id(), flag), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_clickable(&self, element: &ElementRef) -> Result<bool> {
        Ok(self.element_flag(element, "displayed").await? && self.element_flag(element, "enabled").await?)
    }

    async fn execute(&self, script: &str) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }
}

#[async_trait]
impl BrowserDriver for WebDriverClient {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.command(Method::POST, "/url", Some(json!({ "url": url }))).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let value = self
            .command(Method::POST, "/elements", Some(Self::locator_body(locator)))
            .await?;
        Ok(Self::parse_elements(&value))
    }

    async fn find_child(&self, parent: &ElementRef, locator: &Locator) -> Result<Option<ElementRef>> {
        let value = self
            .command(
                Method::POST,
                &format!("/element/{}/elements", parent.id()),
                Some(Self::locator_body(locator)),
            )
            .await?;
        Ok(Self::parse_elements(&value).into_iter().next())
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.id()), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn wait_for_element(&self, locator: &Locator, timeout: Duration) -> Result<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find_elements(locator).await?.into_iter().next() {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(ClaimError::ElementNotFound(format!(
                    "{} not present after {:?}",
                    locator, timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn wait_for_clickable(&self, locator: &Locator, timeout: Duration) -> Result<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            for element in self.find_elements(locator).await? {
                match self.is_clickable(&element).await {
                    Ok(true) => return Ok(element),
                    Ok(false) => {}
                    // Element went stale between lookup and inspection.
                    Err(e) => debug!("Skipping element {}: {}", element.id(), e),
                }
            }
            if Instant::now() >= deadline {
                return Err(ClaimError::ElementNotFound(format!(
                    "{} not clickable after {:?}",
                    locator, timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.id()),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn clear_and_type(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/clear", element.id()),
            Some(json!({})),
        )
        .await?;
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.id()),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.execute(SCROLL_SCRIPT).await?;
        Ok(())
    }

    async fn read_page_text(&self) -> Result<String> {
        match self.execute(PAGE_TEXT_SCRIPT).await {
            Ok(value) => Ok(value.as_str().unwrap_or_default().to_string()),
            Err(e) => {
                warn!("innerText unavailable ({}), falling back to page source", e);
                let value = self.command(Method::GET, "/source", None).await?;
                Ok(value.as_str().unwrap_or_default().to_string())
            }
        }
    }

    async fn quit(&self) -> Result<()> {
        self.command(Method::DELETE, "", None).await?;
        debug!("WebDriver session {} closed", self.session_id);
        Ok(())
    }
}

/// Launches one `WebDriverClient` session per account.
pub struct WebDriverFactory {
    webdriver_url: String,
    engine: BrowserEngine,
    options: LaunchOptions,
}

impl WebDriverFactory {
    pub fn new(webdriver_url: impl Into<String>, engine: BrowserEngine, options: LaunchOptions) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            engine,
            options,
        }
    }

    pub fn engine(&self) -> BrowserEngine {
        self.engine
    }
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>> {
        let client = WebDriverClient::connect(&self.webdriver_url, self.engine, &self.options).await?;
        Ok(Box::new(client))
    }
}
