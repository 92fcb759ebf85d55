use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection};
use std::path::Path;

use crate::{
    claim::{ClaimOutcome, ClaimResult, RunSummary},
    error::Result,
    storage::models::{ClaimRecord, ClaimStats},
};

pub struct Database {
    conn: Connection,
}

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS claim_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account TEXT NOT NULL,
                title TEXT NOT NULL,
                discount TEXT NOT NULL,
                expiry TEXT NOT NULL,
                outcome TEXT NOT NULL,
                is_target INTEGER NOT NULL,
                detail TEXT,
                timestamp TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_claim_account ON claim_history(account)",
            [],
        )?;

        Ok(())
    }

    pub fn save_claim(&self, account: &str, result: &ClaimResult) -> Result<()> {
        let record = ClaimRecord::from_result(account, result);
        self.conn.execute(
            "INSERT INTO claim_history
             (account, title, discount, expiry, outcome, is_target, detail, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.account,
                record.title,
                record.discount,
                record.expiry,
                record.outcome.to_string(),
                record.is_target,
                record.detail,
                record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    /// Records every attempt of a run in one transaction.
    pub fn save_summary(&mut self, summary: &RunSummary) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut saved = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO claim_history
                 (account, title, discount, expiry, outcome, is_target, detail, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (account, result) in summary.flattened() {
                let record = ClaimRecord::from_result(&account.account_name, result);
                stmt.execute(params![
                    record.account,
                    record.title,
                    record.discount,
                    record.expiry,
                    record.outcome.to_string(),
                    record.is_target,
                    record.detail,
                    record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                ])?;
                saved += 1;
            }
        }
        tx.commit()?;
        Ok(saved)
    }

    pub fn get_claim_history(&self, limit: Option<usize>) -> Result<Vec<ClaimRecord>> {
        let query = match limit {
            Some(lim) => format!(
                "SELECT id, account, title, discount, expiry, outcome, is_target, detail, timestamp
                 FROM claim_history
                 ORDER BY timestamp DESC, id DESC
                 LIMIT {}",
                lim
            ),
            None => "SELECT id, account, title, discount, expiry, outcome, is_target, detail, timestamp
                     FROM claim_history
                     ORDER BY timestamp DESC, id DESC"
                .to_string(),
        };

        let mut stmt = self.conn.prepare(&query)?;
        let records = stmt
            .query_map([], |row| {
                let outcome: String = row.get(5)?;
                Ok(ClaimRecord {
                    id: row.get(0)?,
                    account: row.get(1)?,
                    title: row.get(2)?,
                    discount: row.get(3)?,
                    expiry: row.get(4)?,
                    outcome: outcome.parse().unwrap_or(ClaimOutcome::Failed),
                    is_target: row.get(6)?,
                    detail: row.get(7)?,
                    timestamp: parse_timestamp(8, row.get(8)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn get_stats(&self) -> Result<ClaimStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let last_claim: Option<String> = self.conn.query_row(
            "SELECT MAX(timestamp) FROM claim_history WHERE outcome = 'Claimed'",
            [],
            |row| row.get(0),
        )?;

        Ok(ClaimStats {
            total_attempts: count("SELECT COUNT(*) FROM claim_history")?,
            claimed: count("SELECT COUNT(*) FROM claim_history WHERE outcome = 'Claimed'")?,
            failed: count("SELECT COUNT(*) FROM claim_history WHERE outcome = 'Failed'")?,
            targets_claimed: count(
                "SELECT COUNT(*) FROM claim_history WHERE outcome = 'Claimed' AND is_target = 1",
            )?,
            accounts: count("SELECT COUNT(DISTINCT account) FROM claim_history")?,
            last_claim_at: last_claim.map(|raw| parse_timestamp(0, raw)).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voucher::VoucherRecord;

    fn target(title: &str) -> VoucherRecord {
        VoucherRecord::new(title, "100%", "2024-12-31", false).with_classification(true, 10)
    }

    #[test]
    fn test_save_and_read_history() {
        let db = Database::in_memory().unwrap();
        db.save_claim("Main", &ClaimResult::claimed(target("Dibayarin"))).unwrap();
        db.save_claim(
            "Main",
            &ClaimResult::failed(VoucherRecord::new("Ongkir", "Rp10rb", "x", false), "no button"),
        )
        .unwrap();

        let history = db.get_claim_history(None).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].title, "Ongkir");
        assert_eq!(history[0].outcome, ClaimOutcome::Failed);
        assert_eq!(history[0].detail.as_deref(), Some("no button"));
        assert!(history[1].is_target);

        assert_eq!(db.get_claim_history(Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.get_stats().unwrap().total_attempts, 0);
        assert!(db.get_stats().unwrap().last_claim_at.is_none());

        db.save_claim("A", &ClaimResult::claimed(target("Dibayarin"))).unwrap();
        db.save_claim("B", &ClaimResult::claimed(VoucherRecord::new("Cashback", "5%", "x", false)))
            .unwrap();
        db.save_claim("B", &ClaimResult::failed(VoucherRecord::new("Ongkir", "1%", "x", false), "x"))
            .unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.claimed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.targets_claimed, 1);
        assert_eq!(stats.accounts, 2);
        assert!(stats.last_claim_at.is_some());
    }

    #[test]
    fn test_file_database_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("claims.db");
        let db = Database::new(&path).unwrap();
        db.save_claim("A", &ClaimResult::claimed(target("X"))).unwrap();
        assert!(path.exists());
    }
}
