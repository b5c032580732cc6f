use crate::error::{AppError, Result};
use crate::ml::outliers::{filter_outliers, DEFAULT_IQR_MULTIPLIER};
use crate::models::IssueRecord;
use chrono::{Datelike, SubsecRound};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Regression input columns, in the order the model was trained with.
///
/// This is the feature-table order minus `status` and `days_since_created`,
/// which are dropped before scoring. The model's coefficient vector must
/// follow this order exactly.
pub const REGRESSION_COLUMNS: [&str; 8] = [
    "priority",
    "issue_type",
    "created_day",
    "created_month",
    "description_length",
    "summary_length",
    "watch_count",
    "comment_count",
];

/// Seconds per day, used for duration/day conversions
pub(crate) const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

/// Persisted mapping from issue-type label to integer code.
///
/// The codes are fixed at training time: the distinct labels are sorted
/// lexicographically and numbered from zero. Shipping the mapping with the
/// model keeps inference codes identical to training codes regardless of
/// which labels appear in a given batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueTypeVocabulary {
    codes: BTreeMap<String, i64>,
}

impl IssueTypeVocabulary {
    /// Build a vocabulary from training labels: lexicographically sorted
    /// distinct labels, 0-based codes.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let distinct: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self {
            codes: distinct
                .into_iter()
                .enumerate()
                .map(|(code, label)| (label, code as i64))
                .collect(),
        }
    }

    /// Code for a label; unknown labels are an encoding failure, never a
    /// silently assigned fresh code.
    pub fn code(&self, label: &str) -> Result<i64> {
        self.codes
            .get(label)
            .copied()
            .ok_or_else(|| AppError::Encoding(format!("unknown issue type: {label}")))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// One encoded row of the feature table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    /// Priority ordinal (1-based)
    pub priority_code: i64,

    /// Issue type label code (vocabulary-assigned)
    pub issue_type_code: i64,

    /// Day of week the issue was created (Monday = 1)
    pub created_day_code: i64,

    /// Month the issue was created (January = 1)
    pub created_month_code: i64,

    /// Status ordinal (1-based, Closed folded into Resolved)
    pub status_code: i64,

    /// Description length, if the tracker recorded one
    pub description_length: Option<f64>,

    /// Summary length
    pub summary_length: f64,

    /// Watcher count
    pub watch_count: f64,

    /// Comment count
    pub comment_count: f64,

    /// Observed resolution duration in days (target variable); None for
    /// unresolved issues and for suppressed outliers
    pub days_since_created: Option<f64>,
}

impl FeatureRow {
    /// Regression input cells for this row, in `REGRESSION_COLUMNS` order
    pub(crate) fn regression_cells(&self) -> [Option<f64>; REGRESSION_COLUMNS.len()] {
        [
            Some(self.priority_code as f64),
            Some(self.issue_type_code as f64),
            Some(self.created_day_code as f64),
            Some(self.created_month_code as f64),
            self.description_length,
            Some(self.summary_length),
            Some(self.watch_count),
            Some(self.comment_count),
        ]
    }
}

/// Encoded feature table, order-preserving with its input batch.
///
/// The `key` column is carried alongside the numeric rows for joins but is
/// not part of the numeric schema.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureTable {
    keys: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Whether a 1-based day-of-week code falls on a weekend.
///
/// Derived during encoding but excluded from the final numeric schema; the
/// trained model never saw it.
pub fn is_weekend(day_code: i64) -> bool {
    day_code >= 6
}

/// Encoder from raw issue records to the fixed numeric feature table
#[derive(Debug, Clone)]
pub struct FeatureEncoder<'a> {
    vocabulary: &'a IssueTypeVocabulary,
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(vocabulary: &'a IssueTypeVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Encode a batch of issues into the fixed-order feature table.
    ///
    /// Timestamps are truncated to second precision before any arithmetic so
    /// the derived durations match what the model saw at training time.
    /// Outlier suppression runs over the whole batch's target column, so the
    /// same row can encode differently in different batches.
    pub fn encode(&self, issues: &[IssueRecord]) -> Result<FeatureTable> {
        let mut keys = Vec::with_capacity(issues.len());
        let mut rows = Vec::with_capacity(issues.len());

        for issue in issues {
            let created = issue.created.trunc_subsecs(0);
            let resolution = issue.resolutiondate.map(|ts| ts.trunc_subsecs(0));

            let days_since_created = resolution
                .map(|resolved| ((resolved - created).num_seconds() as f64 / SECONDS_PER_DAY).round());

            keys.push(issue.key.clone());
            rows.push(FeatureRow {
                priority_code: issue.priority.ordinal_code(),
                issue_type_code: self.vocabulary.code(&issue.issue_type)?,
                created_day_code: i64::from(created.weekday().number_from_monday()),
                created_month_code: i64::from(created.month()),
                status_code: issue.status.ordinal_code(),
                description_length: issue.description_length,
                summary_length: issue.summary_length,
                watch_count: issue.watch_count,
                comment_count: issue.comment_count,
                days_since_created,
            });
        }

        // suppress target outliers over the whole batch
        let target: Vec<Option<f64>> = rows.iter().map(|r| r.days_since_created).collect();
        let filtered = filter_outliers(&target, DEFAULT_IQR_MULTIPLIER);
        for (row, value) in rows.iter_mut().zip(filtered) {
            row.days_since_created = value;
        }

        Ok(FeatureTable { keys, rows })
    }
}
