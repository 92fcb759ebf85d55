use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::{
    browser::{BrowserDriver, Locator},
    error::{ClaimError, Result},
    voucher::VoucherRecord,
};

/// Page text fragments taken as evidence of a successful claim. This is a
/// best-effort heuristic; no server-side receipt is checked.
pub const SUCCESS_PHRASES: [&str; 5] = [
    "berhasil diklaim",
    "successfully claimed",
    "voucher kamu",
    "success",
    "berhasil",
];

pub const CLAIM_BUTTON_XPATH: &str =
    "//button[contains(text(), 'Klaim') or contains(text(), 'Claim') or contains(text(), 'Ambil')]";

pub const DETAIL_ALREADY_CLAIMED: &str = "voucher already claimed";
pub const DETAIL_NO_ELEMENT: &str = "voucher has no page element";
pub const DETAIL_NO_BUTTON: &str = "claim button not found";
pub const DETAIL_NO_MARKER: &str = "no success marker on page";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimOutcome {
    Claimed,
    Failed,
}

impl std::fmt::Display for ClaimOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimOutcome::Claimed => write!(f, "Claimed"),
            ClaimOutcome::Failed => write!(f, "Failed"),
        }
    }
}

impl std::str::FromStr for ClaimOutcome {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Claimed" => Ok(ClaimOutcome::Claimed),
            "Failed" => Ok(ClaimOutcome::Failed),
            _ => Err(()),
        }
    }
}

/// Outcome of one claim attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResult {
    pub voucher: VoucherRecord,
    pub outcome: ClaimOutcome,
    pub timestamp: DateTime<Utc>,
    pub detail: Option<String>,
}

impl ClaimResult {
    pub fn claimed(voucher: VoucherRecord) -> Self {
        Self {
            voucher,
            outcome: ClaimOutcome::Claimed,
            timestamp: Utc::now(),
            detail: None,
        }
    }

    pub fn failed(voucher: VoucherRecord, detail: impl Into<String>) -> Self {
        Self {
            voucher,
            outcome: ClaimOutcome::Failed,
            timestamp: Utc::now(),
            detail: Some(detail.into()),
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.outcome == ClaimOutcome::Claimed
    }
}

/// Anything able to attempt a claim for a voucher.
#[async_trait]
pub trait VoucherClaimer: Send + Sync {
    async fn claim(&self, voucher: &VoucherRecord) -> ClaimResult;
}

pub fn contains_success_marker(page_text: &str) -> bool {
    let text = page_text.to_lowercase();
    SUCCESS_PHRASES.iter().any(|phrase| text.contains(phrase))
}

/// Clicks a voucher, then its claim button, then inspects the page.
pub struct ClaimExecutor<'a> {
    driver: &'a dyn BrowserDriver,
    claim_button: Locator,
    element_timeout: Duration,
    open_wait: Duration,
    confirm_wait: Duration,
}

impl<'a> ClaimExecutor<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        element_timeout: Duration,
        open_wait: Duration,
        confirm_wait: Duration,
    ) -> Self {
        Self {
            driver,
            claim_button: Locator::xpath(CLAIM_BUTTON_XPATH),
            element_timeout,
            open_wait,
            confirm_wait,
        }
    }

    /// Performs the click sequence and reports whether a success marker
    /// appeared.
    async fn attempt(&self, voucher: &VoucherRecord) -> Result<bool> {
        let element = voucher
            .element
            .as_ref()
            .ok_or_else(|| ClaimError::ElementNotFound(DETAIL_NO_ELEMENT.to_string()))?;

        self.driver.click(element).await?;
        tokio::time::sleep(self.open_wait).await;

        let button = self
            .driver
            .wait_for_clickable(&self.claim_button, self.element_timeout)
            .await?;
        self.driver.click(&button).await?;
        tokio::time::sleep(self.confirm_wait).await;

        let page_text = self.driver.read_page_text().await?;
        Ok(contains_success_marker(&page_text))
    }
}

#[async_trait]
impl VoucherClaimer for ClaimExecutor<'_> {
    async fn claim(&self, voucher: &VoucherRecord) -> ClaimResult {
        info!("🎯 Attempting to claim: {}", voucher.title);

        if voucher.claimed {
            warn!("⚠️  Voucher already claimed, not clicking: {}", voucher.title);
            return ClaimResult::failed(voucher.clone(), DETAIL_ALREADY_CLAIMED);
        }
        if voucher.element.is_none() {
            warn!("⚠️  No page element for voucher: {}", voucher.title);
            return ClaimResult::failed(voucher.clone(), DETAIL_NO_ELEMENT);
        }

        match self.attempt(voucher).await {
            Ok(true) => {
                info!("✅ Successfully claimed: {}", voucher.title);
                ClaimResult::claimed(voucher.clone())
            }
            Ok(false) => {
                warn!("⚠️  Claim may have failed for: {}", voucher.title);
                ClaimResult::failed(voucher.clone(), DETAIL_NO_MARKER)
            }
            Err(e) if e.is_element_missing() => {
                warn!("⚠️  Could not find claim button for: {}", voucher.title);
                ClaimResult::failed(voucher.clone(), DETAIL_NO_BUTTON)
            }
            Err(e) => {
                warn!("❌ Error claiming voucher {}: {}", voucher.title, e);
                ClaimResult::failed(voucher.clone(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ElementRef, MockBrowserDriver};

    fn executor(driver: &MockBrowserDriver) -> ClaimExecutor<'_> {
        ClaimExecutor::new(driver, Duration::from_millis(10), Duration::ZERO, Duration::ZERO)
    }

    fn on_page(title: &str) -> VoucherRecord {
        VoucherRecord::new(title, "10%", "2024-01-01", false).with_element(ElementRef("card".into()))
    }

    #[test]
    fn test_success_marker_detection() {
        assert!(contains_success_marker("Voucher BERHASIL DIKLAIM!"));
        assert!(contains_success_marker("Successfully claimed"));
        assert!(!contains_success_marker("Kuota habis"));
    }

    #[tokio::test]
    async fn test_claimed_voucher_never_clicked() {
        let mut driver = MockBrowserDriver::new();
        driver.expect_click().times(0);
        driver.expect_wait_for_clickable().times(0);

        let voucher = VoucherRecord::new("A", "10%", "x", true).with_element(ElementRef("card".into()));
        let result = executor(&driver).claim(&voucher).await;

        assert_eq!(result.outcome, ClaimOutcome::Failed);
        assert_eq!(result.detail.as_deref(), Some(DETAIL_ALREADY_CLAIMED));
    }

    #[tokio::test]
    async fn test_claim_success() {
        let mut driver = MockBrowserDriver::new();
        driver.expect_click().times(2).returning(|_| Ok(()));
        driver
            .expect_wait_for_clickable()
            .times(1)
            .returning(|_, _| Ok(ElementRef("button".into())));
        driver
            .expect_read_page_text()
            .returning(|| Ok("Voucher berhasil diklaim".to_string()));

        let result = executor(&driver).claim(&on_page("Cashback")).await;
        assert!(result.is_claimed());
        assert!(result.detail.is_none());
    }

    #[tokio::test]
    async fn test_claim_without_marker_is_failed() {
        let mut driver = MockBrowserDriver::new();
        driver.expect_click().returning(|_| Ok(()));
        driver
            .expect_wait_for_clickable()
            .returning(|_, _| Ok(ElementRef("button".into())));
        driver
            .expect_read_page_text()
            .returning(|| Ok("Kuota voucher habis".to_string()));

        let result = executor(&driver).claim(&on_page("Cashback")).await;
        assert_eq!(result.outcome, ClaimOutcome::Failed);
        assert_eq!(result.detail.as_deref(), Some(DETAIL_NO_MARKER));
    }

    #[tokio::test]
    async fn test_button_timeout_is_failed_not_error() {
        let mut driver = MockBrowserDriver::new();
        driver.expect_click().times(1).returning(|_| Ok(()));
        driver
            .expect_wait_for_clickable()
            .returning(|_, _| Err(ClaimError::ElementNotFound("timeout".into())));
        driver.expect_read_page_text().times(0);

        let result = executor(&driver).claim(&on_page("Cashback")).await;
        assert_eq!(result.outcome, ClaimOutcome::Failed);
        assert_eq!(result.detail.as_deref(), Some(DETAIL_NO_BUTTON));
    }

    #[tokio::test]
    async fn test_missing_element_is_failed_without_click() {
        let mut driver = MockBrowserDriver::new();
        driver.expect_click().times(0);

        let voucher = VoucherRecord::new("A", "10%", "x", false);
        let result = executor(&driver).claim(&voucher).await;
        assert_eq!(result.detail.as_deref(), Some(DETAIL_NO_ELEMENT));
    }
}
