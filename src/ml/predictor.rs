use crate::error::{AppError, Result};
use crate::ml::features::{FeatureEncoder, FeatureTable, REGRESSION_COLUMNS, SECONDS_PER_DAY};
use crate::ml::model::LinearModel;
use crate::models::{IssuePriority, IssueRecord, IssueStatus};
use chrono::{Duration, NaiveDateTime, SubsecRound};
use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

/// Timestamp format of the output table
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the prediction output: the original issue columns plus the
/// recomputed resolution date and the duration that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct PredictedIssue {
    pub key: String,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub issue_type: String,
    pub created: String,
    pub updated: String,
    pub resolutiondate: Option<String>,
    pub description_length: Option<f64>,
    pub summary_length: f64,
    pub watch_count: f64,
    pub comment_count: f64,
    /// Predicted duration for scored rows, observed duration (rounded) for
    /// already-resolved rows, None for resolved rows without a date
    pub days_since_created: Option<f64>,
}

/// Stateless prediction pipeline over a read-only model artifact
#[derive(Debug, Clone)]
pub struct ResolutionPredictor<'a> {
    model: &'a LinearModel,
}

impl<'a> ResolutionPredictor<'a> {
    pub fn new(model: &'a LinearModel) -> Self {
        Self { model }
    }

    /// Predict resolution dates for a batch of raw issues.
    ///
    /// Already-resolved rows (status code equal to the Resolved ordinal) are
    /// excluded from the regression input and keep their original resolution
    /// date. Every other row is scored, and rows with a missing
    /// `resolutiondate` get `created + predicted_days`, applied as whole
    /// seconds. Output order matches input order.
    pub fn predict_table(&self, issues: &[IssueRecord]) -> Result<Vec<PredictedIssue>> {
        let encoder = FeatureEncoder::new(&self.model.issue_type_vocabulary);
        let table = encoder.encode(issues)?;

        let resolved_code = IssueStatus::Resolved.ordinal_code();
        let scored_rows: Vec<usize> = table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| row.status_code != resolved_code)
            .map(|(index, _)| index)
            .collect();

        let matrix = self.regression_matrix(&table, &scored_rows)?;
        let predictions = matrix.dot(&self.model.coefficient_vector()) + self.model.intercept;
        debug!(
            batch = issues.len(),
            scored = scored_rows.len(),
            "scored regression batch"
        );

        let mut predicted_days: Vec<Option<f64>> = vec![None; issues.len()];
        for (slot, &row_index) in scored_rows.iter().enumerate() {
            predicted_days[row_index] = Some(predictions[slot]);
        }

        let output = issues
            .iter()
            .enumerate()
            .map(|(index, issue)| {
                let created = issue.created.trunc_subsecs(0);
                let resolution = issue.resolutiondate.map(|ts| ts.trunc_subsecs(0));

                let days_since_created = predicted_days[index].or_else(|| {
                    resolution.map(|resolved| {
                        ((resolved - created).num_seconds() as f64 / SECONDS_PER_DAY).round()
                    })
                });

                let resolutiondate = resolution.or_else(|| {
                    days_since_created.map(|days| created + whole_seconds(days))
                });

                PredictedIssue {
                    key: issue.key.clone(),
                    status: issue.status,
                    priority: issue.priority,
                    issue_type: issue.issue_type.clone(),
                    created: format_timestamp(created),
                    updated: format_timestamp(issue.updated.trunc_subsecs(0)),
                    resolutiondate: resolutiondate.map(format_timestamp),
                    description_length: issue.description_length,
                    summary_length: issue.summary_length,
                    watch_count: issue.watch_count,
                    comment_count: issue.comment_count,
                    days_since_created,
                }
            })
            .collect();

        Ok(output)
    }

    /// Predicted resolution timestamp for the issue matching `key`.
    ///
    /// The first matching row wins when the batch carries duplicate keys.
    pub fn predict_for_key(&self, issues: &[IssueRecord], key: &str) -> Result<String> {
        let table = self.predict_table(issues)?;
        let row = table
            .into_iter()
            .find(|row| row.key == key)
            .ok_or_else(|| AppError::NotFound(format!("issue key {key}")))?;

        row.resolutiondate.ok_or_else(|| {
            AppError::Dataset(format!(
                "issue {key} has a terminal status but no resolution date"
            ))
        })
    }

    /// Build the regression input matrix over the selected rows, filling
    /// null cells from the artifact's persisted imputation values or, for
    /// older artifacts, from the selected rows' per-column mean.
    fn regression_matrix(&self, table: &FeatureTable, selected: &[usize]) -> Result<Array2<f64>> {
        let mut cells: Vec<[Option<f64>; REGRESSION_COLUMNS.len()]> = selected
            .iter()
            .map(|&index| table.rows()[index].regression_cells())
            .collect();

        for (column_index, &column) in REGRESSION_COLUMNS.iter().enumerate() {
            if cells.iter().all(|row| row[column_index].is_some()) {
                continue;
            }
            let fill = match self.model.imputation_value(column) {
                Some(value) => value,
                None => {
                    let present: Vec<f64> =
                        cells.iter().filter_map(|row| row[column_index]).collect();
                    if present.is_empty() {
                        return Err(AppError::Numeric(format!(
                            "column {column} has no values to impute from"
                        )));
                    }
                    present.iter().sum::<f64>() / present.len() as f64
                }
            };
            for row in cells.iter_mut() {
                row[column_index].get_or_insert(fill);
            }
        }

        let mut matrix = Array2::zeros((cells.len(), REGRESSION_COLUMNS.len()));
        for (i, row) in cells.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                matrix[[i, j]] = cell.unwrap_or_default();
            }
        }
        Ok(matrix)
    }
}

/// Fractional days applied as whole seconds; sub-second precision is lost
fn whole_seconds(days: f64) -> Duration {
    Duration::seconds((days * SECONDS_PER_DAY) as i64)
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::features::IssueTypeVocabulary;
    use std::collections::HashMap;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    /// A model that always predicts the intercept, in days
    fn constant_model(days: f64) -> LinearModel {
        LinearModel {
            coefficients: vec![0.0; REGRESSION_COLUMNS.len()],
            intercept: days,
            issue_type_vocabulary: IssueTypeVocabulary::fit(["Bug", "Improvement", "Task"]),
            imputation_values: None,
        }
    }

    fn unresolved(key: &str, created: &str) -> IssueRecord {
        IssueRecord::new(
            key.to_string(),
            IssueStatus::Open,
            IssuePriority::Major,
            "Bug".to_string(),
            ts(created),
            ts(created),
        )
        .with_text_metrics(Some(100.0), 30.0)
        .with_engagement(2.0, 4.0)
    }

    fn resolved(key: &str, created: &str, resolved_at: &str) -> IssueRecord {
        IssueRecord::new(
            key.to_string(),
            IssueStatus::Resolved,
            IssuePriority::Minor,
            "Task".to_string(),
            ts(created),
            ts(resolved_at),
        )
        .with_text_metrics(Some(80.0), 20.0)
        .with_engagement(1.0, 2.0)
        .with_resolution_date(ts(resolved_at))
    }

    #[test]
    fn test_fractional_days_reconstruct_to_whole_seconds() {
        let model = constant_model(5.2);
        let predictor = ResolutionPredictor::new(&model);

        let rows = predictor
            .predict_table(&[unresolved("AVRO-1", "2018-01-01 00:00:00")])
            .unwrap();

        // 5.2 days is 5 days 4h48m, applied as computed
        assert_eq!(rows[0].resolutiondate.as_deref(), Some("2018-01-06 04:48:00"));
        assert_eq!(rows[0].days_since_created, Some(5.2));
    }

    #[test]
    fn test_resolved_issue_keeps_its_resolution_date() {
        let model = constant_model(99.0);
        let predictor = ResolutionPredictor::new(&model);

        let rows = predictor
            .predict_table(&[resolved(
                "AVRO-2",
                "2018-01-01 08:00:00",
                "2018-01-04 08:00:00",
            )])
            .unwrap();

        assert_eq!(rows[0].resolutiondate.as_deref(), Some("2018-01-04 08:00:00"));
        // observed duration, not the model output
        assert_eq!(rows[0].days_since_created, Some(3.0));
    }

    #[test]
    fn test_mixed_batch_preserves_order_and_fills_only_missing() {
        let model = constant_model(2.0);
        let predictor = ResolutionPredictor::new(&model);

        let issues = vec![
            resolved("AVRO-1", "2018-01-01 00:00:00", "2018-01-05 00:00:00"),
            unresolved("AVRO-2", "2018-02-01 12:00:00"),
        ];
        let rows = predictor.predict_table(&issues).unwrap();

        assert_eq!(rows[0].key, "AVRO-1");
        assert_eq!(rows[0].resolutiondate.as_deref(), Some("2018-01-05 00:00:00"));
        assert_eq!(rows[1].key, "AVRO-2");
        assert_eq!(rows[1].resolutiondate.as_deref(), Some("2018-02-03 12:00:00"));
    }

    #[test]
    fn test_predict_for_key_returns_single_timestamp() {
        let model = constant_model(1.0);
        let predictor = ResolutionPredictor::new(&model);
        let issues = vec![
            unresolved("AVRO-1", "2018-01-01 00:00:00"),
            unresolved("AVRO-2171", "2018-04-23 07:30:24"),
        ];

        let prediction = predictor.predict_for_key(&issues, "AVRO-2171").unwrap();
        assert_eq!(prediction, "2018-04-24 07:30:24");
    }

    #[test]
    fn test_predict_for_unknown_key_is_not_found() {
        let model = constant_model(1.0);
        let predictor = ResolutionPredictor::new(&model);
        let issues = vec![unresolved("AVRO-1", "2018-01-01 00:00:00")];

        let err = predictor
            .predict_for_key(&issues, "AVRO-9999")
            .expect_err("unknown key must fail");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_keys_first_match_wins() {
        let model = constant_model(1.0);
        let predictor = ResolutionPredictor::new(&model);
        let issues = vec![
            unresolved("AVRO-1", "2018-01-01 00:00:00"),
            unresolved("AVRO-1", "2018-06-01 00:00:00"),
        ];

        let prediction = predictor.predict_for_key(&issues, "AVRO-1").unwrap();
        assert_eq!(prediction, "2018-01-02 00:00:00");
    }

    #[test]
    fn test_batch_mean_fill_is_batch_dependent() {
        // nonzero weight on description_length makes the fill value visible
        let mut model = constant_model(0.0);
        model.coefficients[4] = 1.0;
        let predictor = ResolutionPredictor::new(&model);

        let mut blank = unresolved("AVRO-BLANK", "2018-01-01 00:00:00");
        blank.description_length = None;

        let mut small = unresolved("AVRO-A", "2018-01-01 00:00:00");
        small.description_length = Some(10.0);
        let mut large = unresolved("AVRO-B", "2018-01-01 00:00:00");
        large.description_length = Some(50.0);

        let batch_small = predictor
            .predict_table(&[blank.clone(), small])
            .unwrap();
        let batch_large = predictor
            .predict_table(&[blank, large])
            .unwrap();

        assert_eq!(batch_small[0].days_since_created, Some(10.0));
        assert_eq!(batch_large[0].days_since_created, Some(50.0));
    }

    #[test]
    fn test_persisted_imputation_overrides_batch_mean() {
        let mut model = constant_model(0.0);
        model.coefficients[4] = 1.0;
        model.imputation_values =
            Some(HashMap::from([("description_length".to_string(), 25.0)]));
        let predictor = ResolutionPredictor::new(&model);

        let mut blank = unresolved("AVRO-BLANK", "2018-01-01 00:00:00");
        blank.description_length = None;
        let mut other = unresolved("AVRO-A", "2018-01-01 00:00:00");
        other.description_length = Some(500.0);

        let rows = predictor.predict_table(&[blank, other]).unwrap();
        assert_eq!(rows[0].days_since_created, Some(25.0));
    }

    #[test]
    fn test_unfillable_column_is_numeric_error() {
        let model = constant_model(1.0);
        let predictor = ResolutionPredictor::new(&model);

        let mut blank = unresolved("AVRO-1", "2018-01-01 00:00:00");
        blank.description_length = None;

        let err = predictor
            .predict_table(&[blank])
            .expect_err("no value to impute from must fail");
        assert!(matches!(err, AppError::Numeric(_)));
    }

    #[test]
    fn test_fully_resolved_batch_skips_scoring() {
        let model = constant_model(7.0);
        let predictor = ResolutionPredictor::new(&model);

        let rows = predictor
            .predict_table(&[
                resolved("AVRO-1", "2018-01-01 00:00:00", "2018-01-03 00:00:00"),
                resolved("AVRO-2", "2018-01-02 00:00:00", "2018-01-06 00:00:00"),
            ])
            .unwrap();

        assert_eq!(rows[0].days_since_created, Some(2.0));
        assert_eq!(rows[1].days_since_created, Some(4.0));
    }

    #[test]
    fn test_terminal_issue_without_date_has_no_prediction() {
        let model = constant_model(3.0);
        let predictor = ResolutionPredictor::new(&model);

        let mut stray = resolved("AVRO-1", "2018-01-01 00:00:00", "2018-01-02 00:00:00");
        stray.resolutiondate = None;

        let rows = predictor.predict_table(std::slice::from_ref(&stray)).unwrap();
        assert_eq!(rows[0].resolutiondate, None);
        assert_eq!(rows[0].days_since_created, None);

        let err = predictor
            .predict_for_key(&[stray], "AVRO-1")
            .expect_err("terminal issue without a date has nothing to return");
        assert!(matches!(err, AppError::Dataset(_)));
    }
}
