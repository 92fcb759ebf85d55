use chrono::Local;
use std::path::PathBuf;

use crate::{
    claim::{RunSummary, SessionOutcome},
    error::Result,
    storage::models::SnapshotFile,
    voucher::VoucherRecord,
};

/// Writes snapshots and text reports under the data directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    data_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn write(&self, file_name: String, contents: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.data_dir)?;
        let path = self.data_dir.join(file_name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// One file per day; later snapshots of the same day overwrite it.
    pub fn save_snapshot(&self, vouchers: &[VoucherRecord]) -> Result<PathBuf> {
        let now = Local::now();
        let snapshot = SnapshotFile::new(vouchers, now);
        let json = serde_json::to_string_pretty(&snapshot)?;
        self.write(format!("monitored_vouchers_{}.json", now.format("%Y%m%d")), &json)
    }

    pub fn save_claim_report(&self, outcome: &SessionOutcome) -> Result<PathBuf> {
        self.write(
            format!("claim_report_{}.txt", Local::now().format("%Y%m%d_%H%M%S")),
            &outcome.render(),
        )
    }

    /// Report of a run restricted to target vouchers.
    pub fn save_target_report(&self, outcome: &SessionOutcome) -> Result<PathBuf> {
        let targets_only = SessionOutcome {
            scanned: outcome.scanned,
            targets_found: outcome.targets_found.clone(),
            claimed: outcome.claimed_targets().cloned().collect(),
            failed: outcome.failed.iter().filter(|r| r.voucher.is_target).cloned().collect(),
        };
        self.write(
            format!("target_report_{}.txt", Local::now().format("%Y%m%d_%H%M%S")),
            &targets_only.render(),
        )
    }

    pub fn save_summary_report(&self, summary: &RunSummary) -> Result<PathBuf> {
        self.write(
            format!("multi_claim_report_{}.txt", Local::now().format("%Y%m%d_%H%M%S")),
            &summary.render(),
        )
    }
}
