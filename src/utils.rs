use colored::Colorize;

use crate::claim::ClaimOutcome;

/// Format timestamp in human-readable format
pub fn format_timestamp(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Shortens `text` to `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn format_outcome(outcome: ClaimOutcome) -> String {
    match outcome {
        ClaimOutcome::Claimed => "Claimed".green().to_string(),
        ClaimOutcome::Failed => "Failed".red().to_string(),
    }
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let mut row = String::new();
    for (col, width) in columns.iter().zip(widths) {
        row.push_str(&format!("{:<width$}  ", col, width = width));
    }
    println!("{}", row.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Gratis Ongkir", 20), "Gratis Ongkir");
        assert_eq!(truncate("Belanjaanmu Dibayarin Tokopedia", 12), "Belanjaan...");
        assert_eq!(truncate("🎫🎫🎫🎫🎫", 4), "🎫...");
    }
}
