use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Browser engine driven through its WebDriver binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    Chrome,
    Firefox,
    Edge,
}

/// Settings applied when a new browser session is requested.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
}

impl BrowserEngine {
    /// Preference order used when nothing is pinned in the config.
    pub const PRIORITY: [BrowserEngine; 3] =
        [BrowserEngine::Chrome, BrowserEngine::Firefox, BrowserEngine::Edge];

    pub fn browser_name(&self) -> &'static str {
        match self {
            BrowserEngine::Chrome => "chrome",
            BrowserEngine::Firefox => "firefox",
            BrowserEngine::Edge => "MicrosoftEdge",
        }
    }

    pub fn driver_binary(&self) -> &'static str {
        match self {
            BrowserEngine::Chrome => "chromedriver",
            BrowserEngine::Firefox => "geckodriver",
            BrowserEngine::Edge => "msedgedriver",
        }
    }

    /// New-session payload for the W3C `POST /session` command.
    pub fn capabilities(&self, options: &LaunchOptions) -> Value {
        let always_match = match self {
            BrowserEngine::Chrome | BrowserEngine::Edge => {
                let mut args = vec![
                    "--no-sandbox".to_string(),
                    "--disable-dev-shm-usage".to_string(),
                    "--disable-gpu".to_string(),
                    format!("--window-size={},{}", options.window_width, options.window_height),
                    format!("--user-agent={}", options.user_agent),
                ];
                if options.headless {
                    args.insert(0, "--headless".to_string());
                }
                let options_key = if *self == BrowserEngine::Chrome {
                    "goog:chromeOptions"
                } else {
                    "ms:edgeOptions"
                };
                json!({
                    "browserName": self.browser_name(),
                    options_key: { "args": args },
                })
            }
            BrowserEngine::Firefox => {
                let mut args = vec![
                    format!("--width={}", options.window_width),
                    format!("--height={}", options.window_height),
                ];
                if options.headless {
                    args.insert(0, "-headless".to_string());
                }
                json!({
                    "browserName": self.browser_name(),
                    "moz:firefoxOptions": {
                        "args": args,
                        "prefs": { "general.useragent.override": options.user_agent },
                    },
                })
            }
        };

        json!({ "capabilities": { "alwaysMatch": always_match } })
    }
}

impl fmt::Display for BrowserEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrowserEngine::Chrome => "chrome",
            BrowserEngine::Firefox => "firefox",
            BrowserEngine::Edge => "edge",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BrowserEngine {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserEngine::Chrome),
            "firefox" => Ok(BrowserEngine::Firefox),
            "edge" | "msedge" => Ok(BrowserEngine::Edge),
            other => Err(format!("unsupported browser engine: {}", other)),
        }
    }
}
