use std::collections::HashSet;

use crate::voucher::types::{VoucherKey, VoucherRecord};

/// Vouchers in `current` whose identity key does not occur in `previous`,
/// in the order of `current`.
pub fn diff(previous: &[VoucherRecord], current: &[VoucherRecord]) -> Vec<VoucherRecord> {
    let known: HashSet<VoucherKey> = previous.iter().map(VoucherRecord::key).collect();

    current
        .iter()
        .filter(|voucher| !known.contains(&voucher.key()))
        .cloned()
        .collect()
}

/// Drops repeated keys within one scan, keeping the first occurrence.
pub fn dedup(vouchers: Vec<VoucherRecord>) -> Vec<VoucherRecord> {
    let mut seen = HashSet::new();
    vouchers
        .into_iter()
        .filter(|voucher| seen.insert(voucher.key()))
        .collect()
}

pub fn unclaimed(vouchers: &[VoucherRecord]) -> Vec<VoucherRecord> {
    vouchers.iter().filter(|v| !v.claimed).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voucher(title: &str, discount: &str, expiry: &str) -> VoucherRecord {
        VoucherRecord::new(title, discount, expiry, false)
    }

    #[test]
    fn test_diff_same_snapshot_is_empty() {
        let snapshot = vec![voucher("A", "10%", "2024-01-01"), voucher("B", "5%", "2024-02-01")];
        assert!(diff(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn test_diff_finds_appended_voucher() {
        let previous = vec![voucher("A", "10%", "2024-01-01")];
        let mut current = previous.clone();
        current.push(voucher("B", "5%", "2024-02-01"));

        let new = diff(&previous, &current);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].title, "B");
    }

    #[test]
    fn test_diff_result_is_subset_with_unseen_keys() {
        let previous = vec![
            voucher("A", "10%", "2024-01-01"),
            voucher("C", "1%", "2024-03-01"),
        ];
        let current = vec![
            voucher("D", "2%", "2024-04-01"),
            voucher("A", "10%", "2024-01-01"),
            voucher("A", "15%", "2024-01-01"),
            voucher("B", "5%", "2024-02-01"),
        ];

        let new = diff(&previous, &current);
        let titles: Vec<(&str, &str)> = new.iter().map(|v| (v.title.as_str(), v.discount.as_str())).collect();
        assert_eq!(titles, vec![("D", "2%"), ("A", "15%"), ("B", "5%")]);

        let previous_keys: HashSet<_> = previous.iter().map(VoucherRecord::key).collect();
        for record in &new {
            assert!(!previous_keys.contains(&record.key()));
            assert!(current.contains(record));
        }
    }

    #[test]
    fn test_diff_ignores_claimed_flag() {
        let previous = vec![voucher("A", "10%", "2024-01-01")];
        let current = vec![VoucherRecord::new("A", "10%", "2024-01-01", true)];
        assert!(diff(&previous, &current).is_empty());
    }

    #[test]
    fn test_diff_against_empty_previous_returns_everything() {
        let current = vec![voucher("A", "10%", "x"), voucher("B", "5%", "y")];
        assert_eq!(diff(&[], &current), current);
        assert!(diff(&current, &[]).is_empty());
    }

    #[test]
    fn test_dedup_keeps_first() {
        let first = voucher("A", "10%", "x").with_classification(false, 1);
        let vouchers = vec![first.clone(), voucher("A", "10%", "x"), voucher("B", "5%", "y")];
        let unique = dedup(vouchers);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0], first);
    }
}
