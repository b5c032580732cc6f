use crate::error::{AppError, Result};
use crate::models::{IssuePriority, IssueRecord, IssueStatus};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound};
use csv::StringRecord;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Columns the raw issue CSV must provide
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "key",
    "status",
    "priority",
    "issue_type",
    "created",
    "updated",
    "description_length",
    "summary_length",
    "watch_count",
    "comment_count",
    "resolutiondate",
];

/// CSV-backed issue dataset, loaded once at startup.
///
/// Rows keep their file order; key lookups return the first match.
#[derive(Debug, Clone)]
pub struct IssueDataset {
    issues: Vec<IssueRecord>,
}

impl IssueDataset {
    /// Load and validate the raw issue table from a CSV file
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| AppError::Dataset(format!("failed to open {}: {e}", path.display())))?;

        let headers = reader.headers()?.clone();
        let columns = column_index(&headers)?;

        let mut issues = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let issue = convert_row(&record, &columns).map_err(|e| annotate_row(e, line + 2))?;
            issues.push(issue);
        }

        info!(path = %path.display(), rows = issues.len(), "issue dataset loaded");
        Ok(Self::from_records(issues))
    }

    /// Build a dataset from already-typed records (used by tests)
    pub fn from_records(issues: Vec<IssueRecord>) -> Self {
        Self { issues }
    }

    /// All records in file order
    pub fn all(&self) -> &[IssueRecord] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// First record matching `key`, if any
    pub fn issue_by_key(&self, key: &str) -> Option<&IssueRecord> {
        self.issues.iter().find(|issue| issue.key == key)
    }

    /// Non-terminal issues created on or before the cutoff
    pub fn unresolved_created_on_or_before(&self, cutoff: NaiveDateTime) -> Vec<&IssueRecord> {
        self.issues
            .iter()
            .filter(|issue| !issue.status.is_terminal() && issue.created <= cutoff)
            .collect()
    }
}

/// Attach the 1-based CSV line number to a row conversion failure
fn annotate_row(err: AppError, line: usize) -> AppError {
    match err {
        AppError::Schema(msg) => AppError::Schema(format!("row {line}: {msg}")),
        AppError::Encoding(msg) => AppError::Encoding(format!("row {line}: {msg}")),
        AppError::Numeric(msg) => AppError::Numeric(format!("row {line}: {msg}")),
        other => other,
    }
}

/// Map required column names to their positions in the header row
fn column_index(headers: &StringRecord) -> Result<HashMap<&'static str, usize>> {
    let mut index = HashMap::new();
    for column in REQUIRED_COLUMNS {
        let position = headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| AppError::Schema(format!("required column missing: {column}")))?;
        index.insert(column, position);
    }
    Ok(index)
}

fn convert_row(record: &StringRecord, columns: &HashMap<&'static str, usize>) -> Result<IssueRecord> {
    let cell = |name: &'static str| -> Result<&str> {
        columns
            .get(name)
            .and_then(|&position| record.get(position))
            .ok_or_else(|| AppError::Schema(format!("row is missing the {name} cell")))
    };

    let status_raw = cell("status")?;
    let status = IssueStatus::from_str(status_raw)
        .map_err(|_| AppError::Encoding(format!("unknown status: {status_raw}")))?;
    let priority_raw = cell("priority")?;
    let priority = IssuePriority::from_str(priority_raw)
        .map_err(|_| AppError::Encoding(format!("unknown priority: {priority_raw}")))?;

    Ok(IssueRecord {
        key: cell("key")?.to_string(),
        status,
        priority,
        issue_type: cell("issue_type")?.to_string(),
        created: parse_timestamp(cell("created")?, "created")?,
        updated: parse_timestamp(cell("updated")?, "updated")?,
        resolutiondate: parse_optional_timestamp(cell("resolutiondate")?, "resolutiondate")?,
        description_length: parse_optional_numeric(cell("description_length")?, "description_length")?,
        summary_length: parse_numeric(cell("summary_length")?, "summary_length")?,
        watch_count: parse_numeric(cell("watch_count")?, "watch_count")?,
        comment_count: parse_numeric(cell("comment_count")?, "comment_count")?,
    })
}

fn parse_numeric(value: &str, column: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| AppError::Numeric(format!("non-numeric {column} value: {value:?}")))
}

fn parse_optional_numeric(value: &str, column: &str) -> Result<Option<f64>> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_numeric(value, column).map(Some)
}

/// Parse a tracker timestamp, truncating sub-second precision.
///
/// Accepts the tracker export format (`2018-01-01T00:00:00.000+0000`) as
/// well as already-normalized forms; offsets are dropped in favor of the
/// timestamp's own wall-clock reading, matching the trained model's view of
/// the data.
fn parse_timestamp(value: &str, column: &str) -> Result<NaiveDateTime> {
    if let Ok(with_offset) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(with_offset.naive_local().trunc_subsecs(0));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.trunc_subsecs(0));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }
    Err(AppError::Schema(format!(
        "malformed {column} timestamp: {value:?}"
    )))
}

fn parse_optional_timestamp(value: &str, column: &str) -> Result<Option<NaiveDateTime>> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_timestamp(value, column).map(Some)
}
