use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Workflow status of a tracked issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum IssueStatus {
    Open,
    #[strum(serialize = "Patch Available")]
    #[serde(rename = "Patch Available")]
    PatchAvailable,
    #[strum(serialize = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Reopened,
    Closed,
}

impl IssueStatus {
    /// Ordinal code used by the trained model (1-based).
    ///
    /// Closed issues carry a resolution date just like Resolved ones, so
    /// Closed maps onto the Resolved code before encoding.
    pub fn ordinal_code(&self) -> i64 {
        match self {
            IssueStatus::Open => 1,
            IssueStatus::PatchAvailable => 2,
            IssueStatus::InProgress => 3,
            IssueStatus::Resolved | IssueStatus::Closed => 4,
            IssueStatus::Reopened => 5,
        }
    }

    /// Whether the issue has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, IssueStatus::Resolved | IssueStatus::Closed)
    }
}

/// Priority of a tracked issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum IssuePriority {
    Trivial,
    Minor,
    Major,
    Critical,
    Blocker,
}

impl IssuePriority {
    /// Ordinal code used by the trained model (1-based)
    pub fn ordinal_code(&self) -> i64 {
        match self {
            IssuePriority::Trivial => 1,
            IssuePriority::Minor => 2,
            IssuePriority::Major => 3,
            IssuePriority::Critical => 4,
            IssuePriority::Blocker => 5,
        }
    }
}

/// One row of the raw issue table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Unique issue key (e.g. "AVRO-2171")
    pub key: String,

    /// Current workflow status
    pub status: IssueStatus,

    /// Priority level
    pub priority: IssuePriority,

    /// Issue type label (open vocabulary, e.g. "Bug", "Improvement")
    pub issue_type: String,

    /// Creation timestamp
    pub created: NaiveDateTime,

    /// Last update timestamp
    pub updated: NaiveDateTime,

    /// Resolution timestamp; None while the issue is unresolved
    pub resolutiondate: Option<NaiveDateTime>,

    /// Length of the description text; the tracker omits it for some issues
    pub description_length: Option<f64>,

    /// Length of the summary text
    pub summary_length: f64,

    /// Number of watchers
    pub watch_count: f64,

    /// Number of comments
    pub comment_count: f64,
}

impl IssueRecord {
    /// Create a new issue record with empty metrics
    pub fn new(
        key: String,
        status: IssueStatus,
        priority: IssuePriority,
        issue_type: String,
        created: NaiveDateTime,
        updated: NaiveDateTime,
    ) -> Self {
        Self {
            key,
            status,
            priority,
            issue_type,
            created,
            updated,
            resolutiondate: None,
            description_length: None,
            summary_length: 0.0,
            watch_count: 0.0,
            comment_count: 0.0,
        }
    }

    pub fn with_resolution_date(mut self, resolutiondate: NaiveDateTime) -> Self {
        self.resolutiondate = Some(resolutiondate);
        self
    }

    pub fn with_text_metrics(
        mut self,
        description_length: Option<f64>,
        summary_length: f64,
    ) -> Self {
        self.description_length = description_length;
        self.summary_length = summary_length;
        self
    }

    pub fn with_engagement(mut self, watch_count: f64, comment_count: f64) -> Self {
        self.watch_count = watch_count;
        self.comment_count = comment_count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_parsing() {
        assert_eq!(IssueStatus::from_str("Open").unwrap(), IssueStatus::Open);
        assert_eq!(
            IssueStatus::from_str("Patch Available").unwrap(),
            IssueStatus::PatchAvailable
        );
        assert_eq!(
            IssueStatus::from_str("In Progress").unwrap(),
            IssueStatus::InProgress
        );
        assert!(IssueStatus::from_str("Rejected").is_err());
    }

    #[test]
    fn test_status_display_round_trip() {
        assert_eq!(IssueStatus::PatchAvailable.to_string(), "Patch Available");
        assert_eq!(IssuePriority::Blocker.to_string(), "Blocker");
    }

    #[test]
    fn test_closed_encodes_as_resolved() {
        assert_eq!(
            IssueStatus::Closed.ordinal_code(),
            IssueStatus::Resolved.ordinal_code()
        );
    }

    #[test]
    fn test_ordinal_codes_are_one_based() {
        assert_eq!(IssueStatus::Open.ordinal_code(), 1);
        assert_eq!(IssueStatus::Reopened.ordinal_code(), 5);
        assert_eq!(IssuePriority::Trivial.ordinal_code(), 1);
        assert_eq!(IssuePriority::Blocker.ordinal_code(), 5);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(IssueStatus::Resolved.is_terminal());
        assert!(IssueStatus::Closed.is_terminal());
        assert!(!IssueStatus::Reopened.is_terminal());
        assert!(!IssueStatus::Open.is_terminal());
    }
}
