use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Voucher page unreachable: {0}")]
    NavigationFailure(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No usable browser found: {0}")]
    BrowserUnavailable(String),

    #[error("WebDriver error ({error}): {message}")]
    WebDriver { error: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Settings(#[from] config::ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClaimError {
    /// True for errors raised when a wait on the page ran out of time or
    /// the element never showed up.
    pub fn is_element_missing(&self) -> bool {
        match self {
            ClaimError::ElementNotFound(_) => true,
            ClaimError::WebDriver { error, .. } => {
                error == "no such element" || error == "timeout"
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClaimError>;
