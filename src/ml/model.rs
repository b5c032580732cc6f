use crate::error::{AppError, Result};
use crate::ml::features::{IssueTypeVocabulary, REGRESSION_COLUMNS};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Trained linear regression artifact.
///
/// The coefficient order matches `REGRESSION_COLUMNS` exactly; the artifact
/// also carries the issue-type vocabulary fixed at training time and,
/// optionally, per-feature imputation values frozen at training time.
/// Artifacts that predate the imputation field still load; prediction then
/// falls back to per-batch means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    /// Regression coefficients, one per regression input column
    pub coefficients: Vec<f64>,

    /// Regression intercept
    pub intercept: f64,

    /// Issue-type label codes fixed at training time
    pub issue_type_vocabulary: IssueTypeVocabulary,

    /// Training-time fill values for null cells, keyed by column name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imputation_values: Option<HashMap<String, f64>>,
}

impl LinearModel {
    /// Load a model artifact from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Model(format!("failed to read artifact {}: {e}", path.display()))
        })?;
        let model: LinearModel = serde_json::from_str(&raw).map_err(|e| {
            AppError::Model(format!("failed to parse artifact {}: {e}", path.display()))
        })?;
        model.validate()?;
        Ok(model)
    }

    /// Check the artifact against the regression schema
    pub fn validate(&self) -> Result<()> {
        if self.coefficients.len() != REGRESSION_COLUMNS.len() {
            return Err(AppError::Schema(format!(
                "model carries {} coefficients but the regression schema has {} columns",
                self.coefficients.len(),
                REGRESSION_COLUMNS.len()
            )));
        }
        Ok(())
    }

    /// Coefficients as an ndarray vector
    pub fn coefficient_vector(&self) -> Array1<f64> {
        Array1::from_vec(self.coefficients.clone())
    }

    /// Predicted resolution duration in days for one regression input row
    pub fn score(&self, row: ArrayView1<f64>) -> f64 {
        row.dot(&self.coefficient_vector()) + self.intercept
    }

    /// Training-time imputation value for a regression column, if persisted
    pub fn imputation_value(&self, column: &str) -> Option<f64> {
        self.imputation_values
            .as_ref()
            .and_then(|values| values.get(column).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    fn test_model() -> LinearModel {
        LinearModel {
            coefficients: vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5],
            intercept: 2.0,
            issue_type_vocabulary: IssueTypeVocabulary::fit(["Bug", "Task"]),
            imputation_values: None,
        }
    }

    #[test]
    fn test_score_is_dot_plus_intercept() {
        let model = test_model();
        let row = array![3.0, 0.0, 1.0, 1.0, 120.0, 40.0, 2.0, 4.0];

        assert_eq!(model.score(row.view()), 3.0 + 0.5 * 4.0 + 2.0);
    }

    #[test]
    fn test_validate_rejects_wrong_width() {
        let mut model = test_model();
        model.coefficients.pop();

        let err = model.validate().expect_err("width mismatch must fail");
        assert!(matches!(err, AppError::Schema(_)));
    }

    #[test]
    fn test_load_round_trip() {
        let model = LinearModel {
            imputation_values: Some(HashMap::from([("description_length".to_string(), 150.0)])),
            ..test_model()
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&model).unwrap()).unwrap();

        let loaded = LinearModel::load(file.path()).unwrap();
        assert_eq!(loaded.coefficients, model.coefficients);
        assert_eq!(loaded.intercept, model.intercept);
        assert_eq!(loaded.issue_type_vocabulary, model.issue_type_vocabulary);
        assert_eq!(loaded.imputation_value("description_length"), Some(150.0));
        assert_eq!(loaded.imputation_value("watch_count"), None);
    }

    #[test]
    fn test_load_accepts_artifact_without_imputation_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"coefficients": [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8],
                "intercept": 1.5,
                "issue_type_vocabulary": {{"Bug": 0, "Task": 1}}}}"#
        )
        .unwrap();

        let loaded = LinearModel::load(file.path()).unwrap();
        assert!(loaded.imputation_values.is_none());
        assert_eq!(loaded.issue_type_vocabulary.code("Task").unwrap(), 1);
    }

    #[test]
    fn test_load_missing_file_is_model_error() {
        let err = LinearModel::load(Path::new("/nonexistent/model.json"))
            .expect_err("missing artifact must fail");
        assert!(matches!(err, AppError::Model(_)));
    }
}
