use clap::Parser;
use colored::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use voucher_claim_bot::{
    browser::{select_engine, BrowserEngine, DriverFactory, LaunchOptions, PlatformInfo, WebDriverFactory},
    claim::{
        recommended_workers, AccountOrchestrator, AccountRunner, BrowserAccountRunner, ClaimResult,
        ClaimSession, SessionOutcome, SessionSettings,
    },
    cli::{Cli, Commands, OutputFormat, RunMode},
    config::{self, AccountsFile, Config, Credentials, TargetsFile},
    error::{self, ClaimError},
    monitor::{PollLoop, PollSettings},
    notify::{announce_targets, Notifier, NotifierSet},
    shutdown::{self, Shutdown},
    storage::{Database, ReportWriter},
    utils,
    voucher::TargetRule,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("voucher_claim_bot=debug,voucher_claim=debug,info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let (trigger, shutdown) = shutdown::channel();
    trigger.on_ctrl_c();

    let result = match cli.command {
        Commands::Claim => {
            info!("Starting single account claim...");
            claim_single(&config, false, shutdown).await
        }

        Commands::Target => {
            info!("Starting target voucher claim...");
            claim_single(&config, true, shutdown).await
        }

        Commands::Multi { mode, workers } => {
            info!("Starting multi-account claim ({:?})", mode);
            claim_multi(&config, mode, workers, shutdown).await
        }

        Commands::Monitor {
            interval,
            max_checks,
            no_claim,
        } => {
            let mut monitor = config.monitor.clone();
            if let Some(interval) = interval {
                monitor.check_interval = interval;
            }
            if let Some(max_checks) = max_checks {
                monitor.max_checks = max_checks;
            }
            if no_claim {
                monitor.auto_claim = false;
            }
            info!("Starting voucher monitor (interval: {}s)", monitor.check_interval);
            run_monitor(&config, PollSettings::from_config(&monitor), shutdown).await
        }

        Commands::Stats { format } => show_stats(&config, format),

        Commands::Platform => show_platform(&config),

        Commands::CheckBrowser { engine } => check_browser(&config, engine).await,

        Commands::Init => {
            info!("Initializing...");
            initialize(&config)
        }
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Picks the engine once and builds the factory every session launches from.
fn driver_factory(config: &Config, pinned: Option<BrowserEngine>) -> error::Result<Arc<WebDriverFactory>> {
    let platform = PlatformInfo::detect();
    let engine = select_engine(pinned.or(config.browser.engine), &platform)?;
    info!("🖥️  Platform: {} ({}), browser: {}", platform.os, platform.arch, engine);

    let options = LaunchOptions {
        headless: config.browser.headless,
        user_agent: config
            .browser
            .user_agent
            .clone()
            .unwrap_or_else(|| platform.user_agent().to_string()),
        window_width: config.browser.window_width,
        window_height: config.browser.window_height,
    };

    Ok(Arc::new(WebDriverFactory::new(
        config.browser.webdriver_url.clone(),
        engine,
        options,
    )))
}

fn load_accounts(config: &Config) -> error::Result<Vec<Credentials>> {
    let accounts = config::load_accounts(&config.storage.accounts_file, env_lookup)?;
    if accounts.is_empty() {
        return Err(ClaimError::ConfigurationMissing(format!(
            "no accounts in {} or TOKOPEDIA_EMAIL/TOKOPEDIA_PASSWORD",
            config.storage.accounts_file
        )));
    }
    Ok(accounts)
}

fn first_account(config: &Config) -> error::Result<Credentials> {
    let mut accounts = load_accounts(config)?;
    if accounts.len() > 1 {
        info!("Using first of {} configured accounts: {}", accounts.len(), accounts[0].name);
    }
    Ok(accounts.swap_remove(0))
}

fn record_claims<'r>(
    db: &Database,
    account: &str,
    results: impl Iterator<Item = &'r ClaimResult>,
) {
    for result in results {
        if let Err(e) = db.save_claim(account, result) {
            warn!("Failed to record claim history: {}", e);
        }
    }
}

async fn claim_single(config: &Config, target_mode: bool, shutdown: Shutdown) -> error::Result<()> {
    let rules = if target_mode {
        config::load_target_rules(&config.storage.targets_file)?
    } else {
        config::load_target_rules_or_default(&config.storage.targets_file)?
    };
    let account = first_account(config)?;
    let factory = driver_factory(config, None)?;
    let runner = BrowserAccountRunner::new(
        factory,
        SessionSettings::from_config(config),
        rules.clone(),
        shutdown,
    );

    let outcome = runner.run(&account).await?;

    let db = Database::new(&config.storage.database_path)?;
    record_claims(&db, &account.name, outcome.claimed.iter().chain(outcome.failed.iter()));

    let notifier = NotifierSet::from_config(config);
    announce_targets(&notifier, &account.name, &outcome.claimed, &rules).await;

    let reports = ReportWriter::new(&config.storage.data_dir);
    let saved = if target_mode {
        reports.save_target_report(&outcome)
    } else {
        reports.save_claim_report(&outcome)
    };
    match saved {
        Ok(path) => info!("📄 Report saved to: {}", path.display()),
        Err(e) => warn!("Failed to save report: {}", e),
    }

    print_session_summary(&outcome, target_mode);
    Ok(())
}

fn print_session_summary(outcome: &SessionOutcome, target_mode: bool) {
    println!("\n{}", "=== Claim Summary ===".cyan().bold());
    println!("  Vouchers scanned:  {}", outcome.scanned);
    println!("  Claimed:           {}", outcome.claimed.len().to_string().green());
    println!("  Failed:            {}", outcome.failed.len().to_string().red());

    if target_mode {
        let hits = outcome.claimed_targets().count();
        if outcome.targets_found.is_empty() {
            println!("{}", "⚠️  No target vouchers found".yellow());
        } else if hits > 0 {
            println!("{}", format!("🎉 {} target vouchers claimed!", hits).green().bold());
        } else {
            println!(
                "{}",
                format!("🎯 {} target vouchers found but none claimed", outcome.targets_found.len()).yellow()
            );
        }
    }

    for result in &outcome.claimed {
        println!("  🎫 {} - {}", result.voucher.title, result.voucher.discount);
    }
}

async fn claim_multi(
    config: &Config,
    mode: RunMode,
    workers: Option<usize>,
    shutdown: Shutdown,
) -> error::Result<()> {
    let accounts = load_accounts(config)?;
    let rules = config::load_target_rules_or_default(&config.storage.targets_file)?;
    let factory = driver_factory(config, None)?;

    let runner: Arc<dyn AccountRunner> = Arc::new(BrowserAccountRunner::new(
        factory,
        SessionSettings::from_config(config),
        rules.clone(),
        shutdown.clone(),
    ));
    let orchestrator = AccountOrchestrator::new(
        runner,
        Duration::from_secs(config.orchestrator.account_delay_secs),
        shutdown,
    )
    .with_reports(ReportWriter::new(&config.storage.data_dir));

    let summary = match mode {
        RunMode::Sequential => orchestrator.run_sequential(&accounts).await?,
        RunMode::Parallel => {
            let max_workers = workers
                .unwrap_or_else(|| recommended_workers(accounts.len()).min(config.orchestrator.max_workers));
            orchestrator.run_parallel(&accounts, max_workers).await?
        }
    };

    let mut db = Database::new(&config.storage.database_path)?;
    match db.save_summary(&summary) {
        Ok(saved) => info!("Recorded {} claim attempts", saved),
        Err(e) => warn!("Failed to record claim history: {}", e),
    }

    let notifier = NotifierSet::from_config(config);
    for result in &summary.results {
        announce_targets(&notifier, &result.account_name, &result.claimed, &rules).await;
    }
    notifier.run_summary(&summary).await;

    summary.print_summary();
    Ok(())
}

async fn run_monitor(config: &Config, settings: PollSettings, shutdown: Shutdown) -> error::Result<()> {
    let rules = config::load_target_rules_or_default(&config.storage.targets_file)?;
    let account = first_account(config)?;
    let factory = driver_factory(config, None)?;
    let notifier = NotifierSet::from_config(config);
    let session_settings = SessionSettings::from_config(config);

    let driver = factory.launch().await?;
    let session = ClaimSession::new(driver.as_ref(), &session_settings);

    let result = async {
        session.login(&account).await?;

        // Reloads the voucher page before every scan.
        let source = session.live_page();
        let executor = session.executor();
        let mut poll = PollLoop::new(&account.name, &source, &executor, &rules, settings, shutdown)
            .with_reports(ReportWriter::new(&config.storage.data_dir))
            .with_notifier(&notifier);
        Ok::<_, ClaimError>(poll.run().await)
    }
    .await;

    if let Err(e) = driver.quit().await {
        warn!("Failed to close browser session: {}", e);
    }

    let summary = result?;
    let db = Database::new(&config.storage.database_path)?;
    record_claims(&db, &account.name, summary.attempts());

    println!("\n{}", "=== Monitor Summary ===".cyan().bold());
    println!("  Checks:        {}", summary.checks);
    println!("  Scan errors:   {}", summary.scan_errors);
    println!("  New vouchers:  {}", summary.new_found);
    println!("  Claimed:       {}", summary.claimed.len().to_string().green());
    println!("  Failed:        {}", summary.failed.len().to_string().red());
    Ok(())
}

fn show_stats(config: &Config, format: OutputFormat) -> error::Result<()> {
    let db = Database::new(&config.storage.database_path)?;
    let stats = db.get_stats()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "=== Voucher Claim Statistics ===".cyan().bold());
    println!("\nClaims:");
    println!("  Attempts:        {}", stats.total_attempts);
    println!("  Claimed:         {}", stats.claimed.to_string().green());
    println!("  Failed:          {}", stats.failed.to_string().red());
    println!("  Targets claimed: {}", stats.targets_claimed.to_string().yellow());
    println!("  Success rate:    {:.1}%", stats.success_rate());
    println!("  Accounts:        {}", stats.accounts);
    if let Some(last) = &stats.last_claim_at {
        println!("  Last claim:      {}", utils::format_timestamp(last));
    }

    let history = db.get_claim_history(Some(10))?;
    if !history.is_empty() {
        let widths = [24, 18, 32, 12, 10];
        println!("\n{}", "Recent Claims:".yellow());
        utils::print_table_border(104);
        utils::print_table_row(&["Timestamp", "Account", "Voucher", "Discount", "Outcome"], &widths);
        utils::print_table_border(104);

        for record in history {
            utils::print_table_row(
                &[
                    &utils::format_timestamp(&record.timestamp),
                    &utils::truncate(&record.account, widths[1]),
                    &utils::truncate(&record.title, widths[2]),
                    &utils::truncate(&record.discount, widths[3]),
                    &utils::format_outcome(record.outcome),
                ],
                &widths,
            );
        }
        utils::print_table_border(104);
    }

    Ok(())
}

fn show_platform(config: &Config) -> error::Result<()> {
    let platform = PlatformInfo::detect();
    println!("{}", "=== Platform ===".cyan().bold());
    println!("  OS:            {}", platform.os);
    println!("  Architecture:  {}", platform.arch);
    println!("  User agent:    {}", platform.user_agent());

    let supported: Vec<String> = platform.supported_engines().iter().map(|e| e.to_string()).collect();
    println!("  Supported:     {}", supported.join(", "));

    let installed = platform.installed_engines();
    if installed.is_empty() {
        println!("  Installed:     {}", "none found on PATH".red());
    } else {
        let names: Vec<String> = installed.iter().map(|e| e.to_string()).collect();
        println!("  Installed:     {}", names.join(", ").green());
    }

    match select_engine(config.browser.engine, &platform) {
        Ok(engine) => println!("  Selected:      {}", engine.to_string().green().bold()),
        Err(e) => println!("  Selected:      {}", e.to_string().red()),
    }
    println!("  WebDriver URL: {}", config.browser.webdriver_url);
    Ok(())
}

async fn check_browser(config: &Config, engine: Option<BrowserEngine>) -> error::Result<()> {
    let factory = driver_factory(config, engine)?;
    let settings = SessionSettings::from_config(config);

    let driver = factory.launch().await?;
    let landed = ClaimSession::new(driver.as_ref(), &settings).check_site().await;
    if let Err(e) = driver.quit().await {
        warn!("Failed to close browser session: {}", e);
    }
    let landed = landed?;

    println!("{}", "=== Browser Check ===".cyan().bold());
    println!("  Browser:       {}", factory.engine().to_string().green());
    println!("  WebDriver URL: {}", config.browser.webdriver_url);
    println!("  Landed on:     {}", landed);
    println!("{}", "✓ Browser session works".green());
    Ok(())
}

fn write_if_missing(path: &str, contents: &str) -> error::Result<bool> {
    let path = Path::new(path);
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(true)
}

fn initialize(config: &Config) -> error::Result<()> {
    println!("{}", "Initializing Voucher Claim Bot...".green());

    std::fs::create_dir_all(&config.storage.data_dir)?;
    println!("{}", "✓ Data directory ready".green());

    let _db = Database::new(&config.storage.database_path)?;
    println!("{}", "✓ Database initialized".green());

    let config_file = format!("{}.toml", config::DEFAULT_CONFIG_PATH);
    let rendered = toml::to_string_pretty(&Config::default())
        .map_err(|e| ClaimError::Config(e.to_string()))?;
    if write_if_missing(&config_file, &rendered)? {
        println!("{}", format!("✓ Wrote {}", config_file).green());
    }

    let sample_accounts = AccountsFile {
        accounts: vec![Credentials::new("Main", "you@example.com", "change-me")],
    };
    if write_if_missing(
        &config.storage.accounts_file,
        &serde_json::to_string_pretty(&sample_accounts)?,
    )? {
        println!("{}", format!("✓ Wrote {}", config.storage.accounts_file).green());
    }

    let mut dibayarin = TargetRule::new("Belanjaanmu Dibayarin", &["belanjaanmu", "dibayarin"], 10);
    dibayarin.notification.sound = true;
    let sample_targets = TargetsFile {
        target_vouchers: vec![dibayarin, TargetRule::new("Gratis Ongkir", &["gratis ongkir"], 5)],
    };
    if write_if_missing(
        &config.storage.targets_file,
        &serde_json::to_string_pretty(&sample_targets)?,
    )? {
        println!("{}", format!("✓ Wrote {}", config.storage.targets_file).green());
    }

    println!("\n{}", "Configuration:".cyan());
    println!("  WebDriver:      {}", config.browser.webdriver_url);
    println!("  Headless:       {}", config.browser.headless);
    println!("  Data dir:       {}", config.storage.data_dir);
    println!("  Check interval: {}s", config.monitor.check_interval);
    println!("  Max workers:    {}", config.orchestrator.max_workers);

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to check browser support", "voucher-claim platform".yellow());
    println!("  {} to test a live browser session", "voucher-claim check-browser".yellow());
    println!("  {} to claim for one account", "voucher-claim claim".yellow());
    println!("  {} to watch for new vouchers", "voucher-claim monitor".yellow());
    Ok(())
}
