pub mod browser;
pub mod claim;
pub mod cli;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod shutdown;
pub mod storage;
pub mod utils;
pub mod voucher;

pub use config::{Config, Credentials};
pub use error::{ClaimError, Result};
