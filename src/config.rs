use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{
    browser::BrowserEngine,
    error::{ClaimError, Result},
    voucher::TargetRule,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/default";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub site: SiteConfig,
    pub claim: ClaimConfig,
    pub orchestrator: OrchestratorConfig,
    pub monitor: MonitorConfig,
    pub storage: StorageConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    /// Pins the engine instead of using platform detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<BrowserEngine>,
    pub headless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
    pub element_timeout_secs: u64,
    pub login_settle_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            engine: None,
            headless: true,
            user_agent: None,
            window_width: 360,
            window_height: 640,
            element_timeout_secs: 10,
            login_settle_secs: 3,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub login_url: String,
    pub voucher_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.tokopedia.com".to_string(),
            login_url: "https://www.tokopedia.com/login".to_string(),
            voucher_url: "https://www.tokopedia.com/voucher".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ClaimConfig {
    /// Random pause between claims inside one session.
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub scroll_passes: u32,
    pub scroll_pause_ms: u64,
    pub open_wait_ms: u64,
    pub confirm_wait_ms: u64,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 2_000,
            max_delay_ms: 5_000,
            scroll_passes: 3,
            scroll_pause_ms: 2_000,
            open_wait_ms: 2_000,
            confirm_wait_ms: 3_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub account_delay_secs: u64,
    pub max_workers: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            account_delay_secs: 30,
            max_workers: crate::claim::MAX_PARALLEL_WORKERS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between two scans.
    pub check_interval: u64,
    pub max_checks: u32,
    pub auto_claim: bool,
    pub notification: bool,
    pub claim_delay_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: 300,
            max_checks: 100,
            auto_claim: true,
            notification: true,
            claim_delay_secs: 3,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub database_path: String,
    pub accounts_file: String,
    pub targets_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            database_path: "data/claims.db".to_string(),
            accounts_file: "config/accounts.json".to_string(),
            targets_file: "config/target_voucher.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default)]
    pub chat_ids: Vec<i64>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Layers built-in defaults, the optional config file and `VOUCHER_*`
    /// environment overrides (`VOUCHER_MONITOR__CHECK_INTERVAL=60`).
    pub fn load(path: &str) -> Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("VOUCHER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.claim.min_delay_ms > self.claim.max_delay_ms {
            return Err(ClaimError::Config(format!(
                "claim.min_delay_ms ({}) exceeds claim.max_delay_ms ({})",
                self.claim.min_delay_ms, self.claim.max_delay_ms
            )));
        }
        if self.orchestrator.max_workers == 0 {
            return Err(ClaimError::Config(
                "orchestrator.max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Login credentials for one account. Passed by value into each session.
#[derive(Clone, Deserialize, Serialize, PartialEq)]
pub struct Credentials {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct AccountsFile {
    #[serde(default)]
    pub accounts: Vec<Credentials>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct TargetsFile {
    #[serde(default)]
    pub target_vouchers: Vec<TargetRule>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Reads `TOKOPEDIA_EMAIL` / `TOKOPEDIA_PASSWORD`.
pub fn single_account_from_env<F>(lookup: F) -> Option<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let email = non_empty(lookup("TOKOPEDIA_EMAIL"))?;
    let password = non_empty(lookup("TOKOPEDIA_PASSWORD"))?;
    Some(Credentials::new("Default_Account", email, password))
}

/// Reads `TOKOPEDIA_EMAIL_{n}` / `TOKOPEDIA_PASSWORD_{n}` from n = 1 up to
/// the first missing pair.
pub fn indexed_accounts_from_env<F>(lookup: F) -> Vec<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let mut accounts = Vec::new();
    for i in 1.. {
        let email = non_empty(lookup(&format!("TOKOPEDIA_EMAIL_{}", i)));
        let password = non_empty(lookup(&format!("TOKOPEDIA_PASSWORD_{}", i)));
        match (email, password) {
            (Some(email), Some(password)) => {
                accounts.push(Credentials::new(format!("Account_{}", i), email, password));
            }
            _ => break,
        }
    }
    accounts
}

/// Accounts file entries first, then indexed environment accounts. Falls back
/// to the single-account variables when both are empty.
pub fn load_accounts<F>(accounts_file: &str, lookup: F) -> Result<Vec<Credentials>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut accounts = Vec::new();

    if Path::new(accounts_file).exists() {
        let raw = std::fs::read_to_string(accounts_file)?;
        let parsed: AccountsFile = serde_json::from_str(&raw)?;
        debug!("Read {} accounts from {}", parsed.accounts.len(), accounts_file);
        accounts.extend(parsed.accounts.into_iter().map(|mut account| {
            if account.name.trim().is_empty() {
                account.name = account.email.clone();
            }
            account
        }));
    }

    accounts.extend(indexed_accounts_from_env(&lookup));

    if accounts.is_empty() {
        if let Some(single) = single_account_from_env(&lookup) {
            accounts.push(single);
        }
    }

    info!("Loaded {} accounts", accounts.len());
    Ok(accounts)
}

pub fn load_target_rules(targets_file: &str) -> Result<Vec<TargetRule>> {
    if !Path::new(targets_file).exists() {
        warn!("Target voucher configuration not found: {}", targets_file);
        return Err(ClaimError::ConfigurationMissing(format!(
            "target voucher file {} does not exist",
            targets_file
        )));
    }

    let raw = std::fs::read_to_string(targets_file)?;
    let parsed: TargetsFile = serde_json::from_str(&raw)?;
    if parsed.target_vouchers.is_empty() {
        return Err(ClaimError::ConfigurationMissing(format!(
            "no target_vouchers entries in {}",
            targets_file
        )));
    }

    info!(
        "Loaded {} target rules ({} enabled)",
        parsed.target_vouchers.len(),
        parsed.target_vouchers.iter().filter(|r| r.enabled).count()
    );
    Ok(parsed.target_vouchers)
}

/// Target rules when the file exists, otherwise none.
pub fn load_target_rules_or_default(targets_file: &str) -> Result<Vec<TargetRule>> {
    match load_target_rules(targets_file) {
        Ok(rules) => Ok(rules),
        Err(ClaimError::ConfigurationMissing(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_indexed_accounts_stop_at_first_gap() {
        let lookup = env(&[
            ("TOKOPEDIA_EMAIL_1", "a@example.com"),
            ("TOKOPEDIA_PASSWORD_1", "pa"),
            ("TOKOPEDIA_EMAIL_2", "b@example.com"),
            ("TOKOPEDIA_PASSWORD_2", "pb"),
            ("TOKOPEDIA_EMAIL_4", "d@example.com"),
            ("TOKOPEDIA_PASSWORD_4", "pd"),
        ]);

        let accounts = indexed_accounts_from_env(lookup);
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "Account_1");
        assert_eq!(accounts[1].email, "b@example.com");
    }

    #[test]
    fn test_single_account_requires_both_values() {
        assert!(single_account_from_env(env(&[("TOKOPEDIA_EMAIL", "a@example.com")])).is_none());
        assert!(single_account_from_env(env(&[
            ("TOKOPEDIA_EMAIL", "a@example.com"),
            ("TOKOPEDIA_PASSWORD", ""),
        ]))
        .is_none());

        let single = single_account_from_env(env(&[
            ("TOKOPEDIA_EMAIL", "a@example.com"),
            ("TOKOPEDIA_PASSWORD", "secret"),
        ]))
        .unwrap();
        assert_eq!(single.name, "Default_Account");
    }

    #[test]
    fn test_load_accounts_merges_file_and_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"accounts": [{{"email": "file@example.com", "password": "x", "name": "Main"}},
                              {{"email": "noname@example.com", "password": "y"}}]}}"#
        )
        .unwrap();

        let lookup = env(&[
            ("TOKOPEDIA_EMAIL_1", "env@example.com"),
            ("TOKOPEDIA_PASSWORD_1", "z"),
            ("TOKOPEDIA_EMAIL", "single@example.com"),
            ("TOKOPEDIA_PASSWORD", "s"),
        ]);

        let accounts = load_accounts(file.path().to_str().unwrap(), lookup).unwrap();
        let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Main", "noname@example.com", "Account_1"]);
    }

    #[test]
    fn test_load_accounts_falls_back_to_single() {
        let lookup = env(&[
            ("TOKOPEDIA_EMAIL", "single@example.com"),
            ("TOKOPEDIA_PASSWORD", "s"),
        ]);
        let accounts = load_accounts("/nonexistent/accounts.json", lookup).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].email, "single@example.com");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("n", "e@example.com", "hunter2");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_missing_target_file_is_configuration_missing() {
        let err = load_target_rules("/nonexistent/target.json").unwrap_err();
        assert!(matches!(err, ClaimError::ConfigurationMissing(_)));
        assert!(load_target_rules_or_default("/nonexistent/target.json")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_load_target_rules() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"target_vouchers": [{{"name": "Dibayarin", "keywords": ["belanjaanmu", "dibayarin"],
                 "enabled": true, "priority": 10, "notification": {{"sound": true}}}}]}}"#
        )
        .unwrap();

        let rules = load_target_rules(file.path().to_str().unwrap()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].priority, 10);
        assert!(rules[0].notification.sound);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.monitor.check_interval, 300);
        assert_eq!(config.monitor.max_checks, 100);
        assert!(config.monitor.auto_claim);
        assert_eq!(config.orchestrator.max_workers, 3);
    }

    #[test]
    fn test_inverted_delay_range_rejected() {
        let mut config = Config::default();
        config.claim.min_delay_ms = 10;
        config.claim.max_delay_ms = 5;
        assert!(matches!(config.validate(), Err(ClaimError::Config(_))));
    }
}
