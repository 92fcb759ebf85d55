use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::requests::Requester;
use teloxide::types::{ChatId, ParseMode};
use teloxide::Bot;
use tracing::{error, info};

use crate::{
    claim::{ClaimResult, RunSummary},
    config::Config,
    notify::{formatters, Notifier},
    voucher::VoucherRecord,
};

/// Pushes notifications to the configured Telegram chats.
pub struct TelegramNotifier {
    bot: Bot,
    chat_ids: Vec<i64>,
}

impl TelegramNotifier {
    pub fn new(config: &Config) -> Option<Self> {
        let telegram_config = config.telegram.as_ref()?;

        if !telegram_config.notifications_enabled {
            info!("Telegram notifications are disabled in config");
            return None;
        }

        if telegram_config.bot_token.is_empty() || telegram_config.chat_ids.is_empty() {
            info!("No Telegram bot token or chat ids configured for notifications");
            return None;
        }

        info!("Telegram notifier initialized for {} chats", telegram_config.chat_ids.len());

        Some(Self {
            bot: Bot::new(telegram_config.bot_token.clone()),
            chat_ids: telegram_config.chat_ids.clone(),
        })
    }

    async fn send_to_all(&self, message: &str) {
        for chat_id in &self.chat_ids {
            if let Err(e) = self
                .bot
                .send_message(ChatId(*chat_id), message)
                .parse_mode(ParseMode::Markdown)
                .await
            {
                error!("Failed to send notification to chat {}: {}", chat_id, e);
            } else {
                info!("Notification sent to chat {}", chat_id);
            }
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn new_vouchers(&self, vouchers: &[VoucherRecord]) {
        if vouchers.is_empty() {
            return;
        }
        self.send_to_all(&formatters::new_vouchers_message(vouchers)).await;
    }

    async fn target_claimed(&self, account: &str, result: &ClaimResult) {
        self.send_to_all(&formatters::target_claimed_message(account, result))
            .await;
    }

    async fn run_summary(&self, summary: &RunSummary) {
        self.send_to_all(&formatters::summary_message(summary)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramConfig;

    fn with_telegram(telegram: TelegramConfig) -> Config {
        Config {
            telegram: Some(telegram),
            ..Config::default()
        }
    }

    #[test]
    fn test_disabled_or_incomplete_config_yields_none() {
        assert!(TelegramNotifier::new(&Config::default()).is_none());

        let disabled = with_telegram(TelegramConfig {
            bot_token: "123:abc".into(),
            chat_ids: vec![42],
            notifications_enabled: false,
        });
        assert!(TelegramNotifier::new(&disabled).is_none());

        let no_chats = with_telegram(TelegramConfig {
            bot_token: "123:abc".into(),
            chat_ids: vec![],
            notifications_enabled: true,
        });
        assert!(TelegramNotifier::new(&no_chats).is_none());
    }

    #[test]
    fn test_enabled_config_builds_notifier() {
        let config = with_telegram(TelegramConfig {
            bot_token: "123:abc".into(),
            chat_ids: vec![42, 43],
            notifications_enabled: true,
        });
        let notifier = TelegramNotifier::new(&config).unwrap();
        assert_eq!(notifier.chat_ids, vec![42, 43]);
    }
}
