pub mod executor;
pub mod orchestrator;
pub mod session;

pub use executor::{ClaimExecutor, ClaimOutcome, ClaimResult, VoucherClaimer};
pub use orchestrator::{
    recommended_workers, AccountOrchestrator, AccountOutcome, AccountResult, RunSummary,
    MAX_PARALLEL_WORKERS,
};
pub use session::{
    claim_vouchers, AccountRunner, BrowserAccountRunner, ClaimSession, LiveVoucherPage, SessionOutcome,
    SessionSettings,
};
