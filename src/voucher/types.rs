use serde::{Deserialize, Serialize};

use crate::browser::ElementRef;

/// A voucher as seen on the page during one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherRecord {
    pub title: String,
    pub discount: String,
    pub expiry: String,
    pub claimed: bool,
    #[serde(default)]
    pub is_target: bool,
    #[serde(default)]
    pub priority: i32,
    /// Page element backing this record; only valid for the scan that
    /// produced it.
    #[serde(skip)]
    pub element: Option<ElementRef>,
}

/// Identity used to compare snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoucherKey {
    pub title: String,
    pub discount: String,
    pub expiry: String,
}

impl VoucherRecord {
    pub fn new(
        title: impl Into<String>,
        discount: impl Into<String>,
        expiry: impl Into<String>,
        claimed: bool,
    ) -> Self {
        Self {
            title: title.into(),
            discount: discount.into(),
            expiry: expiry.into(),
            claimed,
            is_target: false,
            priority: 0,
            element: None,
        }
    }

    pub fn with_element(mut self, element: ElementRef) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_classification(mut self, is_target: bool, priority: i32) -> Self {
        self.is_target = is_target;
        self.priority = priority;
        self
    }

    pub fn key(&self) -> VoucherKey {
        VoucherKey {
            title: self.title.clone(),
            discount: self.discount.clone(),
            expiry: self.expiry.clone(),
        }
    }

    /// Looser match used when re-locating a voucher on a fresh scan.
    pub fn same_offer(&self, other: &VoucherRecord) -> bool {
        self.title == other.title && self.discount == other.discount
    }
}

/// Operator-configured rule marking high-value vouchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRule {
    #[serde(default)]
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub notification: TargetNotification,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetNotification {
    #[serde(default)]
    pub sound: bool,
}

fn default_enabled() -> bool {
    true
}

impl TargetRule {
    pub fn new(name: impl Into<String>, keywords: &[&str], priority: i32) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            enabled: true,
            priority,
            notification: TargetNotification::default(),
        }
    }

    /// Case-insensitive substring match of any keyword against `title`.
    pub fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && title.contains(&keyword.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_claim_state_and_element() {
        let a = VoucherRecord::new("A", "10%", "2024-01-01", false);
        let b = VoucherRecord::new("A", "10%", "2024-01-01", true)
            .with_element(ElementRef("x".into()))
            .with_classification(true, 9);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_rule_match_is_case_insensitive() {
        let rule = TargetRule::new("dibayarin", &["BELANJAANMU"], 10);
        assert!(rule.matches("Belanjaanmu Dibayarin Tokopedia"));
        assert!(!rule.matches("Gratis Ongkir"));
    }

    #[test]
    fn test_empty_keyword_never_matches() {
        let rule = TargetRule::new("empty", &[""], 1);
        assert!(!rule.matches("anything"));
    }

    #[test]
    fn test_rule_defaults_when_deserialized() {
        let rule: TargetRule = serde_json::from_str(r#"{"keywords": ["cashback"]}"#).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.priority, 0);
        assert!(!rule.notification.sound);
    }
}
