use chrono::{DateTime, Utc};
use futures::{stream, FutureExt, StreamExt};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    claim::{
        executor::ClaimResult,
        session::{AccountRunner, SessionOutcome},
    },
    config::Credentials,
    error::{ClaimError, Result},
    shutdown::Shutdown,
    storage::ReportWriter,
};

/// Upper bound on concurrent browser sessions against the site.
pub const MAX_PARALLEL_WORKERS: usize = 3;

/// `min(accounts, 3)`, never below one.
pub fn recommended_workers(accounts: usize) -> usize {
    accounts.clamp(1, MAX_PARALLEL_WORKERS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountOutcome {
    Success,
    Failure,
}

/// Result of one account's session within a run.
#[derive(Debug, Clone, Serialize)]
pub struct AccountResult {
    pub account_name: String,
    pub email: String,
    pub outcome: AccountOutcome,
    pub claimed: Vec<ClaimResult>,
    pub failed: Vec<ClaimResult>,
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl AccountResult {
    fn finish(account: &Credentials, start_time: DateTime<Utc>, session: Result<SessionOutcome>) -> Self {
        let (outcome, claimed, failed, error) = match session {
            Ok(session) => (AccountOutcome::Success, session.claimed, session.failed, None),
            Err(e) => (AccountOutcome::Failure, Vec::new(), Vec::new(), Some(e.to_string())),
        };

        Self {
            account_name: account.name.clone(),
            email: account.email.clone(),
            outcome,
            claimed,
            failed,
            error,
            start_time,
            end_time: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AccountOutcome::Success
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Aggregate over every account of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub results: Vec<AccountResult>,
    pub generated_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(results: Vec<AccountResult>) -> Self {
        Self {
            results,
            generated_at: Utc::now(),
        }
    }

    pub fn total_accounts(&self) -> usize {
        self.results.len()
    }

    pub fn successful_accounts(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_accounts(&self) -> usize {
        self.total_accounts() - self.successful_accounts()
    }

    pub fn total_claimed(&self) -> usize {
        self.results.iter().map(|r| r.claimed.len()).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.results.iter().map(|r| r.failed.len()).sum()
    }

    /// Every claim attempt of the run, tagged with its account.
    pub fn flattened(&self) -> impl Iterator<Item = (&AccountResult, &ClaimResult)> {
        self.results
            .iter()
            .flat_map(|r| r.claimed.iter().chain(r.failed.iter()).map(move |c| (r, c)))
    }

    /// Plain-text report.
    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let mut report = format!(
            "\n📊 MULTI-ACCOUNT CLAIM SUMMARY REPORT - {}\n{}\n\n\
             📈 STATISTICS:\n\
             • Total Accounts: {}\n\
             • Successful Accounts: {}\n\
             • Failed Accounts: {}\n\
             • Total Vouchers Claimed: {}\n\
             • Total Failed Claims: {}\n\n{}\n\n📋 DETAILED RESULTS:\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            rule,
            self.total_accounts(),
            self.successful_accounts(),
            self.failed_accounts(),
            self.total_claimed(),
            self.total_failed(),
            rule,
        );

        for result in &self.results {
            let status = if result.is_success() { "✅ SUCCESS" } else { "❌ FAILED" };
            report.push_str(&format!(
                "\n{} - {} ({})\n  └─ Duration: {:.2} seconds\n  └─ Claimed: {} vouchers\n  └─ Failed: {} vouchers\n",
                status,
                result.account_name,
                result.email,
                result.duration_secs(),
                result.claimed.len(),
                result.failed.len(),
            ));
            if let Some(error) = &result.error {
                report.push_str(&format!("  └─ Error: {}\n", error));
            }
            if !result.claimed.is_empty() {
                report.push_str("  └─ Claimed Vouchers:\n");
                for claim in &result.claimed {
                    report.push_str(&format!(
                        "     • {} - {}\n",
                        claim.voucher.title, claim.voucher.discount
                    ));
                }
            }
        }

        report.push_str(&format!("\n{}\n", rule));
        report
    }

    /// Print a formatted summary to console
    pub fn print_summary(&self) {
        println!("{}", self.render());
    }
}

/// Runs one claim session per account, isolating failures per account.
pub struct AccountOrchestrator {
    runner: Arc<dyn AccountRunner>,
    account_delay: Duration,
    shutdown: Shutdown,
    reports: Option<ReportWriter>,
}

impl AccountOrchestrator {
    pub fn new(runner: Arc<dyn AccountRunner>, account_delay: Duration, shutdown: Shutdown) -> Self {
        Self {
            runner,
            account_delay,
            shutdown,
            reports: None,
        }
    }

    /// Writes the summary report of every run through `writer`.
    pub fn with_reports(mut self, writer: ReportWriter) -> Self {
        self.reports = Some(writer);
        self
    }

    async fn run_account(runner: &dyn AccountRunner, account: &Credentials) -> AccountResult {
        let start_time = Utc::now();
        let span = info_span!("account", name = %account.name);

        let session = AssertUnwindSafe(runner.run(account).instrument(span))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(ClaimError::Other(anyhow::anyhow!("claim session panicked")))
            });

        let result = AccountResult::finish(account, start_time, session);
        match &result.error {
            None => info!("✅ {}: {} vouchers claimed", result.account_name, result.claimed.len()),
            Some(e) => error!("❌ {}: {}", result.account_name, e),
        }
        result
    }

    /// Accounts in input order with a pause between consecutive accounts.
    pub async fn run_sequential(&self, accounts: &[Credentials]) -> Result<RunSummary> {
        info!("🚀 Starting sequential claims for {} accounts", accounts.len());

        let mut results = Vec::with_capacity(accounts.len());
        for (i, account) in accounts.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                warn!("Stopping before {} remaining accounts", accounts.len() - i);
                break;
            }

            info!("📋 Processing account {}/{}: {}", i + 1, accounts.len(), account.name);
            results.push(Self::run_account(self.runner.as_ref(), account).await);

            if i + 1 < accounts.len() {
                info!("⏳ Waiting {} seconds before next account...", self.account_delay.as_secs());
                if !self.shutdown.sleep(self.account_delay).await {
                    warn!("Stopping before {} remaining accounts", accounts.len() - i - 1);
                    break;
                }
            }
        }

        self.conclude(results)
    }

    /// At most `max_workers` sessions at once; results arrive in
    /// completion order.
    pub async fn run_parallel(&self, accounts: &[Credentials], max_workers: usize) -> Result<RunSummary> {
        if max_workers == 0 {
            return Err(ClaimError::Config("max_workers must be at least 1".to_string()));
        }
        info!(
            "🚀 Starting parallel claims for {} accounts (max_workers: {})",
            accounts.len(),
            max_workers
        );

        let mut completed = stream::iter(accounts.iter())
            .map(|account| {
                let runner = Arc::clone(&self.runner);
                let shutdown = self.shutdown.clone();
                async move {
                    if shutdown.is_cancelled() {
                        warn!("Skipping {}: stop requested", account.name);
                        return None;
                    }
                    Some(Self::run_account(runner.as_ref(), account).await)
                }
            })
            .buffer_unordered(max_workers);

        let mut results = Vec::with_capacity(accounts.len());
        while let Some(result) = completed.next().await {
            results.extend(result);
        }

        self.conclude(results)
    }

    fn conclude(&self, results: Vec<AccountResult>) -> Result<RunSummary> {
        let summary = RunSummary::new(results);
        if let Some(writer) = &self.reports {
            match writer.save_summary_report(&summary) {
                Ok(path) => info!("📄 Summary report saved to: {}", path.display()),
                Err(e) => warn!("Failed to save summary report: {}", e),
            }
        }
        Ok(summary)
    }
}
