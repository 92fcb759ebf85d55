use crate::voucher::types::{TargetRule, VoucherRecord};

/// First enabled rule whose keywords hit the title, in rule order.
pub fn matching_rule<'a>(title: &str, rules: &'a [TargetRule]) -> Option<&'a TargetRule> {
    rules.iter().filter(|rule| rule.enabled).find(|rule| rule.matches(title))
}

/// `(is_target, priority)` for a voucher. First match wins; no match gives
/// `(false, 0)`.
pub fn classify(voucher: &VoucherRecord, rules: &[TargetRule]) -> (bool, i32) {
    match matching_rule(&voucher.title, rules) {
        Some(rule) => (true, rule.priority),
        None => (false, 0),
    }
}

/// Stable sort, highest priority first.
pub fn sort_by_priority(mut vouchers: Vec<VoucherRecord>) -> Vec<VoucherRecord> {
    vouchers.sort_by(|a, b| b.priority.cmp(&a.priority));
    vouchers
}

/// Classifies every voucher and orders the result for claiming.
pub fn prioritize(vouchers: Vec<VoucherRecord>, rules: &[TargetRule]) -> Vec<VoucherRecord> {
    let classified = vouchers
        .into_iter()
        .map(|voucher| {
            let (is_target, priority) = classify(&voucher, rules);
            voucher.with_classification(is_target, priority)
        })
        .collect();
    sort_by_priority(classified)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: &str, priority: i32) -> VoucherRecord {
        VoucherRecord::new(title, "10%", "2024-01-01", false).with_classification(priority > 0, priority)
    }

    #[test]
    fn test_classify_case_insensitive() {
        let rules = vec![TargetRule::new("dibayarin", &["belanjaanmu"], 10)];
        let voucher = VoucherRecord::new("Belanjaanmu Dibayarin", "100%", "today", false);
        assert_eq!(classify(&voucher, &rules), (true, 10));
        assert_eq!(classify(&voucher, &rules), classify(&voucher, &rules));
    }

    #[test]
    fn test_classify_first_match_wins() {
        let rules = vec![
            TargetRule::new("low", &["cashback"], 1),
            TargetRule::new("high", &["cashback", "besar"], 50),
        ];
        let voucher = VoucherRecord::new("Cashback Besar", "20%", "x", false);
        assert_eq!(classify(&voucher, &rules), (true, 1));
    }

    #[test]
    fn test_classify_skips_disabled_rules() {
        let mut disabled = TargetRule::new("off", &["ongkir"], 99);
        disabled.enabled = false;
        let rules = vec![disabled, TargetRule::new("on", &["gratis"], 3)];

        let voucher = VoucherRecord::new("Gratis Ongkir", "Rp10rb", "x", false);
        assert_eq!(classify(&voucher, &rules), (true, 3));

        let other = VoucherRecord::new("Ongkir Hemat", "Rp5rb", "x", false);
        assert_eq!(classify(&other, &rules), (false, 0));
    }

    #[test]
    fn test_sort_by_priority_is_stable() {
        let sorted = sort_by_priority(vec![titled("X", 0), titled("Y", 5), titled("Z", 0)]);
        let titles: Vec<&str> = sorted.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["Y", "X", "Z"]);
    }

    #[test]
    fn test_prioritize_moves_targets_first() {
        let rules = vec![TargetRule::new("dibayarin", &["dibayarin"], 10)];
        let vouchers = vec![
            VoucherRecord::new("Gratis Ongkir", "Rp10rb", "x", false),
            VoucherRecord::new("Belanjaanmu Dibayarin Tokopedia", "100%", "x", false),
        ];

        let ordered = prioritize(vouchers, &rules);
        assert!(ordered[0].is_target);
        assert_eq!(ordered[0].priority, 10);
        assert!(!ordered[1].is_target);
    }
}
