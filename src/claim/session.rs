use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::{
    browser::{BrowserDriver, DriverFactory, Locator},
    claim::executor::{ClaimExecutor, ClaimResult, VoucherClaimer},
    config::{ClaimConfig, Config, Credentials, SiteConfig},
    error::{ClaimError, Result},
    shutdown::Shutdown,
    voucher::{detector, prioritize, PageVoucherSource, TargetRule, VoucherRecord, VoucherSource},
};

const EMAIL_INPUT: &str = "input[name='email']";
const CONTINUE_BUTTON: &str = "button[data-testid='btn-login-continue']";
const PASSWORD_INPUT: &str = "input[name='password']";
const LOGIN_BUTTON: &str = "button[data-testid='btn-login']";
const VOUCHER_MENU_XPATH: &str = "//a[contains(@href, 'voucher') or contains(text(), 'Voucher')]";

/// Timing and site settings shared by every session of a run.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub site: SiteConfig,
    pub claim: ClaimConfig,
    pub element_timeout: Duration,
    pub login_settle: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            site: config.site.clone(),
            claim: config.claim.clone(),
            element_timeout: Duration::from_secs(config.browser.element_timeout_secs),
            login_settle: Duration::from_secs(config.browser.login_settle_secs),
        }
    }
}

/// What one account session produced.
#[derive(Debug, Clone, Default)]
pub struct SessionOutcome {
    pub scanned: usize,
    pub targets_found: Vec<VoucherRecord>,
    pub claimed: Vec<ClaimResult>,
    pub failed: Vec<ClaimResult>,
}

impl SessionOutcome {
    pub fn record(&mut self, result: ClaimResult) {
        if result.is_claimed() {
            self.claimed.push(result);
        } else {
            self.failed.push(result);
        }
    }

    pub fn claimed_targets(&self) -> impl Iterator<Item = &ClaimResult> {
        self.claimed.iter().filter(|r| r.voucher.is_target)
    }

    /// Plain-text claim report for a single account.
    pub fn render(&self) -> String {
        let rule = "=".repeat(50);
        let thin = "-".repeat(30);
        let mut report = format!(
            "\n📊 VOUCHER CLAIM REPORT - {}\n{}\n\n✅ SUCCESSFULLY CLAIMED: {}\n❌ FAILED TO CLAIM: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            rule,
            self.claimed.len(),
            self.failed.len(),
        );

        if !self.targets_found.is_empty() {
            report.push_str(&format!(
                "🎯 TARGETS FOUND: {} (claimed: {})\n",
                self.targets_found.len(),
                self.claimed_targets().count()
            ));
        }

        report.push_str(&format!("\nCLAIMED VOUCHERS:\n{}\n", thin));
        for result in &self.claimed {
            report.push_str(&format!("🎫 {} - {}\n", result.voucher.title, result.voucher.discount));
        }

        report.push_str(&format!("\nFAILED VOUCHERS:\n{}\n", thin));
        for result in &self.failed {
            report.push_str(&format!(
                "❌ {} - {} ({})\n",
                result.voucher.title,
                result.voucher.discount,
                result.detail.as_deref().unwrap_or("unknown")
            ));
        }

        report.push_str(&format!("\n{}\n", rule));
        report
    }
}

/// Host part of the site used to recognise an authenticated page,
/// without a leading `www.`.
fn site_host(base_url: &str) -> String {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| base_url.to_string())
}

pub fn is_authenticated_url(current_url: &str, base_url: &str) -> bool {
    current_url.contains(&site_host(base_url)) && !current_url.contains("login")
}

/// Login, navigation and claim steps against one browser session.
pub struct ClaimSession<'a> {
    driver: &'a dyn BrowserDriver,
    settings: &'a SessionSettings,
}

impl<'a> ClaimSession<'a> {
    pub fn new(driver: &'a dyn BrowserDriver, settings: &'a SessionSettings) -> Self {
        Self { driver, settings }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        info!("🔐 Attempting login with email: {}", credentials.email);
        let timeout = self.settings.element_timeout;

        self.driver
            .navigate(&self.settings.site.login_url)
            .await
            .map_err(|e| ClaimError::AuthenticationFailure(format!("login page unreachable: {}", e)))?;

        let email_input = self.driver.wait_for_element(&Locator::css(EMAIL_INPUT), timeout).await?;
        self.driver.clear_and_type(&email_input, &credentials.email).await?;
        let continue_btn = self.driver.wait_for_clickable(&Locator::css(CONTINUE_BUTTON), timeout).await?;
        self.driver.click(&continue_btn).await?;

        let password_input = self.driver.wait_for_element(&Locator::css(PASSWORD_INPUT), timeout).await?;
        self.driver.clear_and_type(&password_input, &credentials.password).await?;
        let login_btn = self.driver.wait_for_clickable(&Locator::css(LOGIN_BUTTON), timeout).await?;
        self.driver.click(&login_btn).await?;

        tokio::time::sleep(self.settings.login_settle).await;

        let current = self.driver.current_url().await?;
        if is_authenticated_url(&current, &self.settings.site.base_url) {
            info!("✅ Login successful");
            Ok(())
        } else {
            error!("❌ Login failed, still at {}", current);
            Err(ClaimError::AuthenticationFailure(format!(
                "{} did not reach an authenticated page (at {})",
                credentials.email, current
            )))
        }
    }

    /// Home page voucher menu first, the direct voucher URL as fallback.
    pub async fn open_voucher_page(&self) -> Result<()> {
        info!("🔍 Navigating to voucher page...");
        let site = &self.settings.site;

        self.driver
            .navigate(&site.base_url)
            .await
            .map_err(|e| ClaimError::NavigationFailure(format!("{}: {}", site.base_url, e)))?;

        let via_menu = match self
            .driver
            .wait_for_clickable(&Locator::xpath(VOUCHER_MENU_XPATH), self.settings.element_timeout)
            .await
        {
            Ok(menu) => self.driver.click(&menu).await.is_ok(),
            Err(_) => false,
        };

        if !via_menu {
            self.driver
                .navigate(&site.voucher_url)
                .await
                .map_err(|e| ClaimError::NavigationFailure(format!("{}: {}", site.voucher_url, e)))?;
        }

        tokio::time::sleep(Duration::from_millis(self.settings.claim.open_wait_ms)).await;
        info!("✅ Voucher page open");
        Ok(())
    }

    pub fn source(&self) -> PageVoucherSource<'a> {
        PageVoucherSource::new(
            self.driver,
            self.settings.claim.scroll_passes,
            Duration::from_millis(self.settings.claim.scroll_pause_ms),
        )
    }

    pub fn executor(&self) -> ClaimExecutor<'a> {
        ClaimExecutor::new(
            self.driver,
            self.settings.element_timeout,
            Duration::from_millis(self.settings.claim.open_wait_ms),
            Duration::from_millis(self.settings.claim.confirm_wait_ms),
        )
    }

    /// Source that reloads the voucher page before every scan, so each scan
    /// sees vouchers published since the previous one.
    pub fn live_page(&self) -> LiveVoucherPage<'_> {
        LiveVoucherPage { session: self }
    }

    /// Opens the site home page and reports the URL the browser landed on.
    pub async fn check_site(&self) -> Result<String> {
        let base_url = &self.settings.site.base_url;
        self.driver
            .navigate(base_url)
            .await
            .map_err(|e| ClaimError::NavigationFailure(format!("{}: {}", base_url, e)))?;
        self.driver.current_url().await
    }

    /// Scans, orders targets first and claims every unclaimed voucher.
    pub async fn claim_all(&self, rules: &[TargetRule], shutdown: &Shutdown) -> Result<SessionOutcome> {
        let vouchers = self.source().scan().await?;
        claim_vouchers(vouchers, rules, &self.executor(), &self.settings.claim, shutdown).await
    }
}

/// Voucher page of a logged-in session, reopened on every scan.
pub struct LiveVoucherPage<'a> {
    session: &'a ClaimSession<'a>,
}

#[async_trait]
impl VoucherSource for LiveVoucherPage<'_> {
    async fn scan(&self) -> Result<Vec<VoucherRecord>> {
        self.session.open_voucher_page().await?;
        self.session.source().scan().await
    }
}

fn pacing_delay(claim: &ClaimConfig) -> Duration {
    Duration::from_millis(rand::random_range(claim.min_delay_ms..=claim.max_delay_ms))
}

/// Claims the unclaimed vouchers of one scan in priority order, pausing a
/// random interval between attempts.
pub async fn claim_vouchers(
    vouchers: Vec<VoucherRecord>,
    rules: &[TargetRule],
    claimer: &dyn VoucherClaimer,
    pacing: &ClaimConfig,
    shutdown: &Shutdown,
) -> Result<SessionOutcome> {
    let mut outcome = SessionOutcome {
        scanned: vouchers.len(),
        ..Default::default()
    };

    if vouchers.is_empty() {
        info!("📭 No vouchers found");
        return Ok(outcome);
    }

    let ordered = prioritize(vouchers, rules);
    outcome.targets_found = ordered.iter().filter(|v| v.is_target).cloned().collect();
    if !outcome.targets_found.is_empty() {
        info!("🎯 Target vouchers found: {}", outcome.targets_found.len());
    }

    let pending = detector::unclaimed(&ordered);
    info!("🎯 Found {} unclaimed vouchers", pending.len());

    for (i, voucher) in pending.iter().enumerate() {
        if shutdown.is_cancelled() {
            warn!("Stopping before {} remaining vouchers", pending.len() - i);
            break;
        }
        outcome.record(claimer.claim(voucher).await);

        if i + 1 < pending.len() && !shutdown.sleep(pacing_delay(pacing)).await {
            break;
        }
    }

    Ok(outcome)
}

/// Runs one complete session for an account.
#[async_trait]
pub trait AccountRunner: Send + Sync {
    async fn run(&self, account: &Credentials) -> Result<SessionOutcome>;
}

/// Opens a browser per account, logs in, claims and always closes the
/// browser afterwards.
pub struct BrowserAccountRunner {
    factory: Arc<dyn DriverFactory>,
    settings: SessionSettings,
    rules: Vec<TargetRule>,
    shutdown: Shutdown,
}

impl BrowserAccountRunner {
    pub fn new(
        factory: Arc<dyn DriverFactory>,
        settings: SessionSettings,
        rules: Vec<TargetRule>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            factory,
            settings,
            rules,
            shutdown,
        }
    }
}

#[async_trait]
impl AccountRunner for BrowserAccountRunner {
    async fn run(&self, account: &Credentials) -> Result<SessionOutcome> {
        info!("🚀 Starting claim process...");
        let driver = self.factory.launch().await?;

        let session = ClaimSession::new(driver.as_ref(), &self.settings);
        let result = async {
            session.login(account).await?;
            session.open_voucher_page().await?;
            session.claim_all(&self.rules, &self.shutdown).await
        }
        .await;

        if let Err(e) = driver.quit().await {
            warn!("Failed to close browser session: {}", e);
        }
        info!("🧹 Cleanup completed");

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ElementRef, MockBrowserDriver};
    use crate::claim::executor::ClaimOutcome;
    use std::sync::Mutex;

    /// Records claim order; claims everything except titles starting with "F".
    struct RecordingClaimer {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VoucherClaimer for RecordingClaimer {
        async fn claim(&self, voucher: &VoucherRecord) -> ClaimResult {
            self.seen.lock().unwrap().push(voucher.title.clone());
            if voucher.title.starts_with('F') {
                ClaimResult::failed(voucher.clone(), "nope")
            } else {
                ClaimResult::claimed(voucher.clone())
            }
        }
    }

    fn fast_pacing() -> ClaimConfig {
        ClaimConfig {
            min_delay_ms: 0,
            max_delay_ms: 0,
            ..Default::default()
        }
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            site: SiteConfig::default(),
            claim: fast_pacing(),
            element_timeout: Duration::from_millis(10),
            login_settle: Duration::ZERO,
        }
    }

    #[test]
    fn test_authenticated_url() {
        let base = "https://www.tokopedia.com";
        assert!(is_authenticated_url("https://www.tokopedia.com/", base));
        assert!(!is_authenticated_url("https://www.tokopedia.com/login?ld=x", base));
        assert!(!is_authenticated_url("https://accounts.example.com/", base));
    }

    #[tokio::test]
    async fn test_claim_vouchers_targets_first_and_skips_claimed() {
        let rules = vec![TargetRule::new("dibayarin", &["dibayarin"], 10)];
        let vouchers = vec![
            VoucherRecord::new("Gratis Ongkir", "Rp10rb", "x", false),
            VoucherRecord::new("Already", "5%", "x", true),
            VoucherRecord::new("Failing Cashback", "5%", "x", false),
            VoucherRecord::new("Belanjaanmu Dibayarin", "100%", "x", false),
        ];
        let claimer = RecordingClaimer { seen: Mutex::new(Vec::new()) };

        let outcome = claim_vouchers(vouchers, &rules, &claimer, &fast_pacing(), &Shutdown::never())
            .await
            .unwrap();

        let seen = claimer.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["Belanjaanmu Dibayarin", "Gratis Ongkir", "Failing Cashback"]);
        assert_eq!(outcome.scanned, 4);
        assert_eq!(outcome.claimed.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].outcome, ClaimOutcome::Failed);
        assert_eq!(outcome.targets_found.len(), 1);
        assert_eq!(outcome.claimed_targets().count(), 1);
    }

    #[tokio::test]
    async fn test_claim_vouchers_stops_when_cancelled() {
        let (trigger, shutdown) = crate::shutdown::channel();
        trigger.trigger();
        let claimer = RecordingClaimer { seen: Mutex::new(Vec::new()) };

        let outcome = claim_vouchers(
            vec![VoucherRecord::new("A", "1%", "x", false)],
            &[],
            &claimer,
            &fast_pacing(),
            &shutdown,
        )
        .await
        .unwrap();

        assert!(claimer.seen.lock().unwrap().is_empty());
        assert!(outcome.claimed.is_empty());
    }

    #[tokio::test]
    async fn test_login_rejected_when_still_on_login_page() {
        let mut driver = MockBrowserDriver::new();
        driver.expect_navigate().returning(|_| Ok(()));
        driver
            .expect_wait_for_element()
            .returning(|_, _| Ok(ElementRef("input".into())));
        driver.expect_clear_and_type().returning(|_, _| Ok(()));
        driver
            .expect_wait_for_clickable()
            .returning(|_, _| Ok(ElementRef("button".into())));
        driver.expect_click().returning(|_| Ok(()));
        driver
            .expect_current_url()
            .returning(|| Ok("https://www.tokopedia.com/login".to_string()));

        let settings = settings();
        let session = ClaimSession::new(&driver, &settings);
        let err = session
            .login(&Credentials::new("a", "a@example.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::AuthenticationFailure(_)));
    }

    #[tokio::test]
    async fn test_voucher_page_falls_back_to_direct_url() {
        let mut driver = MockBrowserDriver::new();
        driver
            .expect_navigate()
            .withf(|url| url == "https://www.tokopedia.com")
            .times(1)
            .returning(|_| Ok(()));
        driver
            .expect_navigate()
            .withf(|url| url == "https://www.tokopedia.com/voucher")
            .times(1)
            .returning(|_| Ok(()));
        driver
            .expect_wait_for_clickable()
            .returning(|_, _| Err(ClaimError::ElementNotFound("menu".into())));
        driver.expect_click().times(0);

        let mut settings = settings();
        settings.claim.open_wait_ms = 0;
        let session = ClaimSession::new(&driver, &settings);
        session.open_voucher_page().await.unwrap();
    }

    #[tokio::test]
    async fn test_check_site_reports_landing_url() {
        let mut driver = MockBrowserDriver::new();
        driver
            .expect_navigate()
            .withf(|url| url == "https://www.tokopedia.com")
            .times(1)
            .returning(|_| Ok(()));
        driver
            .expect_current_url()
            .returning(|| Ok("https://www.tokopedia.com/".to_string()));

        let settings = settings();
        let session = ClaimSession::new(&driver, &settings);
        assert_eq!(session.check_site().await.unwrap(), "https://www.tokopedia.com/");
    }

    #[tokio::test]
    async fn test_voucher_page_unreachable() {
        let mut driver = MockBrowserDriver::new();
        driver.expect_navigate().returning(|_| {
            Err(ClaimError::WebDriver {
                error: "unknown error".into(),
                message: "net::ERR_NAME_NOT_RESOLVED".into(),
            })
        });

        let settings = settings();
        let session = ClaimSession::new(&driver, &settings);
        let err = session.open_voucher_page().await.unwrap_err();
        assert!(matches!(err, ClaimError::NavigationFailure(_)));
    }
}
