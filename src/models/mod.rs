pub mod issue;

pub use issue::{IssuePriority, IssueRecord, IssueStatus};
