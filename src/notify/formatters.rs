use crate::{
    claim::{ClaimResult, RunSummary},
    voucher::VoucherRecord,
};

/// Most vouchers listed in a single message.
const MAX_LISTED: usize = 10;

/// Escapes the characters legacy Telegram Markdown treats as markup.
pub fn escape_md(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn format_voucher_tg(voucher: &VoucherRecord) -> String {
    let marker = if voucher.is_target { "🎯" } else { "🎫" };
    format!(
        "{} *{}*\n💰 {}\n📅 {}",
        marker,
        escape_md(&voucher.title),
        escape_md(&voucher.discount),
        escape_md(&voucher.expiry)
    )
}

pub fn new_vouchers_message(vouchers: &[VoucherRecord]) -> String {
    let mut message = format!("🆕 *New Vouchers Found*\n\n📊 Count: {}\n", vouchers.len());
    for voucher in vouchers.iter().take(MAX_LISTED) {
        message.push('\n');
        message.push_str(&format_voucher_tg(voucher));
        message.push('\n');
    }
    if vouchers.len() > MAX_LISTED {
        message.push_str(&format!("\n_...and {} more_", vouchers.len() - MAX_LISTED));
    }
    message
}

pub fn target_claimed_message(account: &str, result: &ClaimResult) -> String {
    format!(
        "🎉 *Target Voucher Claimed*\n\nAccount: `{}`\n{}\n\n_Claimed at {}_",
        account,
        format_voucher_tg(&result.voucher),
        result.timestamp.format("%Y-%m-%d %H:%M UTC")
    )
}

pub fn summary_message(summary: &RunSummary) -> String {
    let emoji = if summary.failed_accounts() == 0 { "🎉" } else { "📦" };
    format!(
        "{} *Multi-Account Claim Complete*\n\n\
        👥 Accounts: {} ({} ok, {} failed)\n\
        ✅ Vouchers claimed: {}\n\
        ❌ Failed claims: {}",
        emoji,
        summary.total_accounts(),
        summary.successful_accounts(),
        summary.failed_accounts(),
        summary.total_claimed(),
        summary.total_failed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_md() {
        assert_eq!(escape_md("cash_back *50%*"), "cash\\_back \\*50%\\*");
        assert_eq!(escape_md("Gratis Ongkir"), "Gratis Ongkir");
    }

    #[test]
    fn test_new_vouchers_message_truncates() {
        let vouchers: Vec<_> = (0..12)
            .map(|i| VoucherRecord::new(format!("Voucher {}", i), "5%", "x", false))
            .collect();
        let message = new_vouchers_message(&vouchers);
        assert!(message.contains("Count: 12"));
        assert!(message.contains("Voucher 9"));
        assert!(!message.contains("Voucher 10"));
        assert!(message.contains("and 2 more"));
    }
}
