/// Resolution prediction pipeline
///
/// This module provides the feature-engineering and prediction pipeline:
/// - IQR-based outlier suppression on the target variable
/// - Deterministic encoding of raw issue records into a fixed feature table
/// - Linear-model scoring and resolution date reconstruction

pub mod features;
pub mod model;
pub mod outliers;
pub mod predictor;

pub use features::{FeatureEncoder, FeatureRow, FeatureTable, IssueTypeVocabulary};
pub use model::LinearModel;
pub use outliers::{filter_outliers, DEFAULT_IQR_MULTIPLIER};
pub use predictor::{PredictedIssue, ResolutionPredictor};
