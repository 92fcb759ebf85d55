use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    claim::{ClaimResult, VoucherClaimer},
    config::MonitorConfig,
    notify::{announce_targets, Notifier},
    shutdown::Shutdown,
    storage::ReportWriter,
    voucher::{detector, prioritize, TargetRule, VoucherRecord, VoucherSource},
};

pub const DETAIL_VANISHED: &str = "voucher no longer on page";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Scanning,
    Comparing,
    Claiming,
    Waiting,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub check_interval: Duration,
    pub max_checks: u32,
    pub auto_claim: bool,
    pub notify: bool,
    pub claim_delay: Duration,
}

impl PollSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            check_interval: Duration::from_secs(config.check_interval),
            max_checks: config.max_checks,
            auto_claim: config.auto_claim,
            notify: config.notification,
            claim_delay: Duration::from_secs(config.claim_delay_secs),
        }
    }
}

/// What a monitoring run did.
#[derive(Debug, Clone, Default)]
pub struct PollSummary {
    pub checks: u32,
    pub scan_errors: u32,
    pub new_found: usize,
    pub claimed: Vec<ClaimResult>,
    pub failed: Vec<ClaimResult>,
}

impl PollSummary {
    fn record(&mut self, result: ClaimResult) {
        if result.is_claimed() {
            self.claimed.push(result);
        } else {
            self.failed.push(result);
        }
    }

    pub fn attempts(&self) -> impl Iterator<Item = &ClaimResult> {
        self.claimed.iter().chain(self.failed.iter())
    }
}

/// Periodically scans one authenticated session, claiming vouchers that
/// were not in the previous scan.
pub struct PollLoop<'a> {
    account: String,
    source: &'a dyn VoucherSource,
    claimer: &'a dyn VoucherClaimer,
    rules: &'a [TargetRule],
    settings: PollSettings,
    shutdown: Shutdown,
    reports: Option<ReportWriter>,
    notifier: Option<&'a dyn Notifier>,
    state: PollState,
    snapshot: Vec<VoucherRecord>,
}

impl<'a> PollLoop<'a> {
    pub fn new(
        account: impl Into<String>,
        source: &'a dyn VoucherSource,
        claimer: &'a dyn VoucherClaimer,
        rules: &'a [TargetRule],
        settings: PollSettings,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            account: account.into(),
            source,
            claimer,
            rules,
            settings,
            shutdown,
            reports: None,
            notifier: None,
            state: PollState::Idle,
            snapshot: Vec::new(),
        }
    }

    pub fn with_reports(mut self, writer: ReportWriter) -> Self {
        self.reports = Some(writer);
        self
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Vouchers seen by the last successful scan.
    pub fn snapshot(&self) -> &[VoucherRecord] {
        &self.snapshot
    }

    fn enter(&mut self, state: PollState) {
        debug!("Monitor state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Runs until `max_checks` scans are done or a stop is requested.
    pub async fn run(&mut self) -> PollSummary {
        let mut summary = PollSummary::default();
        info!(
            "👀 Monitoring vouchers every {}s (max {} checks)",
            self.settings.check_interval.as_secs(),
            self.settings.max_checks
        );

        while summary.checks < self.settings.max_checks && !self.shutdown.is_cancelled() {
            summary.checks += 1;
            info!("🔍 Check {}/{}", summary.checks, self.settings.max_checks);
            self.cycle(&mut summary).await;

            if summary.checks >= self.settings.max_checks {
                break;
            }
            self.enter(PollState::Waiting);
            if !self.shutdown.sleep(self.settings.check_interval).await {
                break;
            }
        }

        self.enter(PollState::Stopped);
        info!(
            "🛑 Monitoring stopped after {} checks: {} new, {} claimed, {} failed",
            summary.checks,
            summary.new_found,
            summary.claimed.len(),
            summary.failed.len()
        );
        summary
    }

    async fn cycle(&mut self, summary: &mut PollSummary) {
        self.enter(PollState::Scanning);
        let current = match self.source.scan().await {
            Ok(vouchers) => prioritize(vouchers, self.rules),
            Err(e) => {
                warn!("❌ Scan failed, keeping previous snapshot: {}", e);
                summary.scan_errors += 1;
                return;
            }
        };

        self.enter(PollState::Comparing);
        let new_vouchers = detector::diff(&self.snapshot, &current);
        self.persist(&current);
        self.snapshot = current;

        if new_vouchers.is_empty() {
            info!("No new vouchers");
            return;
        }
        summary.new_found += new_vouchers.len();
        if self.settings.notify {
            if let Some(notifier) = self.notifier {
                notifier.new_vouchers(&new_vouchers).await;
            }
        }

        let pending = detector::unclaimed(&new_vouchers);
        if !self.settings.auto_claim || pending.is_empty() {
            return;
        }

        self.enter(PollState::Claiming);
        for (i, voucher) in pending.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                warn!("Stopping before {} remaining vouchers", pending.len() - i);
                return;
            }

            let result = self.claim_fresh(voucher).await;
            if result.is_claimed() && result.voucher.is_target {
                if let Some(notifier) = self.notifier {
                    announce_targets(notifier, &self.account, std::slice::from_ref(&result), self.rules)
                        .await;
                }
            }
            summary.record(result);

            if i + 1 < pending.len() && !self.shutdown.sleep(self.settings.claim_delay).await {
                return;
            }
        }
    }

    /// Element references go stale between scans, so the voucher is looked
    /// up again on a fresh scan before clicking.
    async fn claim_fresh(&self, voucher: &VoucherRecord) -> ClaimResult {
        let fresh = match self.source.scan().await {
            Ok(vouchers) => vouchers
                .into_iter()
                .find(|v| v.same_offer(voucher) && !v.claimed),
            Err(e) => return ClaimResult::failed(voucher.clone(), e.to_string()),
        };

        match fresh {
            Some(found) => {
                let found = found.with_classification(voucher.is_target, voucher.priority);
                self.claimer.claim(&found).await
            }
            None => {
                warn!("⚠️  {} disappeared before it could be claimed", voucher.title);
                ClaimResult::failed(voucher.clone(), DETAIL_VANISHED)
            }
        }
    }

    fn persist(&self, vouchers: &[VoucherRecord]) {
        if let Some(writer) = &self.reports {
            match writer.save_snapshot(vouchers) {
                Ok(path) => debug!("Snapshot saved to {}", path.display()),
                Err(e) => warn!("Failed to save snapshot: {}", e),
            }
        }
    }
}
