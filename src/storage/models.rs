use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    claim::{ClaimOutcome, ClaimResult},
    voucher::VoucherRecord,
};

/// Daily snapshot file written by the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub timestamp: DateTime<Local>,
    pub vouchers: Vec<VoucherRecord>,
    pub total_count: usize,
    pub unclaimed_count: usize,
}

impl SnapshotFile {
    pub fn new(vouchers: &[VoucherRecord], timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            vouchers: vouchers.to_vec(),
            total_count: vouchers.len(),
            unclaimed_count: vouchers.iter().filter(|v| !v.claimed).count(),
        }
    }
}

/// One row of the claim history table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: i64,
    pub account: String,
    pub title: String,
    pub discount: String,
    pub expiry: String,
    pub outcome: ClaimOutcome,
    pub is_target: bool,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn from_result(account: &str, result: &ClaimResult) -> Self {
        Self {
            id: 0,
            account: account.to_string(),
            title: result.voucher.title.clone(),
            discount: result.voucher.discount.clone(),
            expiry: result.voucher.expiry.clone(),
            outcome: result.outcome,
            is_target: result.voucher.is_target,
            detail: result.detail.clone(),
            timestamp: result.timestamp,
        }
    }
}

/// Totals over the claim history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClaimStats {
    pub total_attempts: usize,
    pub claimed: usize,
    pub failed: usize,
    pub targets_claimed: usize,
    pub accounts: usize,
    pub last_claim_at: Option<DateTime<Utc>>,
}

impl ClaimStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.claimed as f64 / self.total_attempts as f64 * 100.0
        }
    }
}
