pub mod detector;
pub mod priority;
pub mod source;
pub mod types;

pub use detector::diff;
pub use priority::{classify, matching_rule, prioritize, sort_by_priority};
pub use source::{PageSelectors, PageVoucherSource, VoucherSource};
pub use types::{TargetNotification, TargetRule, VoucherKey, VoucherRecord};
