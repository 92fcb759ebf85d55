pub mod driver;
pub mod engine;
pub mod platform;
pub mod webdriver;

pub use driver::{BrowserDriver, DriverFactory, ElementRef, Locator};
pub use engine::{BrowserEngine, LaunchOptions};
pub use platform::{select_engine, OsFamily, PlatformInfo};
pub use webdriver::{WebDriverClient, WebDriverFactory};

#[cfg(test)]
pub use driver::MockBrowserDriver;
