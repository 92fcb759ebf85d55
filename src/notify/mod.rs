pub mod formatters;
pub mod telegram;

use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

use crate::{
    claim::{ClaimResult, RunSummary},
    config::Config,
    voucher::{matching_rule, TargetRule, VoucherRecord},
};

pub use telegram::TelegramNotifier;

/// Receives the events worth telling an operator about.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// The monitor found vouchers absent from its previous snapshot.
    async fn new_vouchers(&self, vouchers: &[VoucherRecord]);

    async fn target_claimed(&self, account: &str, result: &ClaimResult);

    async fn run_summary(&self, summary: &RunSummary);
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn new_vouchers(&self, vouchers: &[VoucherRecord]) {
        info!("🆕 Found {} new vouchers", vouchers.len());
        for voucher in vouchers {
            info!("   • {} - {} (until {})", voucher.title, voucher.discount, voucher.expiry);
        }
    }

    async fn target_claimed(&self, account: &str, result: &ClaimResult) {
        info!("🎉 Target voucher claimed for {}: {}", account, result.voucher.title);
    }

    async fn run_summary(&self, summary: &RunSummary) {
        info!(
            "📊 Run finished: {}/{} accounts succeeded, {} vouchers claimed",
            summary.successful_accounts(),
            summary.total_accounts(),
            summary.total_claimed()
        );
    }
}

/// Fans every event out to each registered notifier in order.
#[derive(Clone, Default)]
pub struct NotifierSet {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Log output always, Telegram when configured and enabled.
    pub fn from_config(config: &Config) -> Self {
        let set = Self::new().with(Arc::new(LogNotifier));
        match TelegramNotifier::new(config) {
            Some(telegram) => set.with(Arc::new(telegram)),
            None => set,
        }
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

#[async_trait]
impl Notifier for NotifierSet {
    async fn new_vouchers(&self, vouchers: &[VoucherRecord]) {
        for notifier in &self.notifiers {
            notifier.new_vouchers(vouchers).await;
        }
    }

    async fn target_claimed(&self, account: &str, result: &ClaimResult) {
        for notifier in &self.notifiers {
            notifier.target_claimed(account, result).await;
        }
    }

    async fn run_summary(&self, summary: &RunSummary) {
        for notifier in &self.notifiers {
            notifier.run_summary(summary).await;
        }
    }
}

/// Whether the rule that matched `voucher` asks for an audible alert.
pub fn wants_sound(voucher: &VoucherRecord, rules: &[TargetRule]) -> bool {
    matching_rule(&voucher.title, rules).is_some_and(|rule| rule.notification.sound)
}

/// Rings the terminal bell.
pub fn ring_bell() {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(b"\x07");
    let _ = stdout.flush();
}

/// Announces every claimed target voucher of `claimed`, ringing the bell
/// for rules that ask for sound.
pub async fn announce_targets(
    notifier: &dyn Notifier,
    account: &str,
    claimed: &[ClaimResult],
    rules: &[TargetRule],
) {
    for result in claimed.iter().filter(|r| r.is_claimed() && r.voucher.is_target) {
        if wants_sound(&result.voucher, rules) {
            ring_bell();
        }
        notifier.target_claimed(account, result).await;
    }
}
