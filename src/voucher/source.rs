use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    browser::{BrowserDriver, ElementRef, Locator},
    error::Result,
    voucher::{detector, types::VoucherRecord},
};

/// Produces the current list of vouchers.
#[async_trait]
pub trait VoucherSource: Send + Sync {
    async fn scan(&self) -> Result<Vec<VoucherRecord>>;
}

/// CSS selectors used to pull voucher cards out of the voucher page.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub card: Locator,
    pub title: Locator,
    pub discount: Locator,
    pub expiry: Locator,
    pub claimed_marker: Locator,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            card: Locator::css("[data-testid*='voucher'], .voucher-card, [class*='voucher']"),
            title: Locator::css("[class*='title'], h2, h3, .name"),
            discount: Locator::css("[class*='discount'], [class*='value'], .amount"),
            expiry: Locator::css("[class*='expiry'], [class*='valid'], .date"),
            claimed_marker: Locator::css("[class*='claimed'], [class*='used']"),
        }
    }
}

const CLAIMED_WORDS: [&str; 2] = ["claimed", "diklaim"];

/// Scrapes vouchers from the page currently loaded in `driver`.
pub struct PageVoucherSource<'a> {
    driver: &'a dyn BrowserDriver,
    selectors: PageSelectors,
    scroll_passes: u32,
    scroll_pause: Duration,
}

impl<'a> PageVoucherSource<'a> {
    pub fn new(driver: &'a dyn BrowserDriver, scroll_passes: u32, scroll_pause: Duration) -> Self {
        Self {
            driver,
            selectors: PageSelectors::default(),
            scroll_passes,
            scroll_pause,
        }
    }

    async fn child_text(&self, card: &ElementRef, locator: &Locator) -> Result<Option<String>> {
        match self.driver.find_child(card, locator).await? {
            Some(child) => {
                let text = self.driver.element_text(&child).await?;
                Ok(Some(text.trim().to_string()))
            }
            None => Ok(None),
        }
    }

    async fn extract(&self, card: ElementRef) -> Result<VoucherRecord> {
        let title = self
            .child_text(&card, &self.selectors.title)
            .await?
            .unwrap_or_else(|| "Unknown Voucher".to_string());
        let discount = self
            .child_text(&card, &self.selectors.discount)
            .await?
            .unwrap_or_else(|| "Unknown".to_string());
        let expiry = self
            .child_text(&card, &self.selectors.expiry)
            .await?
            .unwrap_or_else(|| "Unknown".to_string());
        let claimed = self
            .child_text(&card, &self.selectors.claimed_marker)
            .await?
            .map(|text| {
                let text = text.to_lowercase();
                CLAIMED_WORDS.iter().any(|word| text.contains(word))
            })
            .unwrap_or(false);

        Ok(VoucherRecord::new(title, discount, expiry, claimed).with_element(card))
    }
}

#[async_trait]
impl VoucherSource for PageVoucherSource<'_> {
    async fn scan(&self) -> Result<Vec<VoucherRecord>> {
        info!("Scanning for available vouchers...");

        // Lazy-loaded lists only render more cards after scrolling.
        for _ in 0..self.scroll_passes {
            self.driver.scroll_to_bottom().await?;
            tokio::time::sleep(self.scroll_pause).await;
        }

        let cards = self.driver.find_elements(&self.selectors.card).await?;
        debug!("Found {} candidate voucher elements", cards.len());

        let mut vouchers = Vec::with_capacity(cards.len());
        for card in cards {
            let id = card.id().to_string();
            match self.extract(card).await {
                Ok(voucher) => vouchers.push(voucher),
                Err(e) => warn!("Error extracting voucher from element {}: {}", id, e),
            }
        }

        let vouchers = detector::dedup(vouchers);
        info!("Found {} vouchers", vouchers.len());
        Ok(vouchers)
    }
}
