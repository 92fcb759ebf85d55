pub mod db;
pub mod models;
pub mod reports;

pub use db::Database;
pub use models::{ClaimRecord, ClaimStats, SnapshotFile};
pub use reports::ReportWriter;
