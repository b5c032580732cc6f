use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::ml::ResolutionPredictor;
use crate::models::IssueRecord;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Predicted resolution date for a single issue
pub async fn resolve_prediction(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ResolvePredictionResponse>> {
    let issue = state
        .dataset
        .issue_by_key(&key)
        .ok_or_else(|| AppError::NotFound(format!("issue key {key}")))?;

    let predictor = ResolutionPredictor::new(&state.model);
    let predicted_resolution_date =
        predictor.predict_for_key(std::slice::from_ref(issue), &key)?;

    Ok(Json(ResolvePredictionResponse {
        issue: key,
        predicted_resolution_date,
    }))
}

#[derive(Debug, Serialize)]
pub struct ResolvePredictionResponse {
    pub issue: String,
    pub predicted_resolution_date: String,
}

/// Predicted resolution dates for all unresolved issues created on or
/// before the given date
pub async fn resolved_since_now(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<ReleaseForecastResponse>> {
    let cutoff = parse_cutoff(&date)?;

    let batch: Vec<IssueRecord> = state
        .dataset
        .unresolved_created_on_or_before(cutoff)
        .into_iter()
        .cloned()
        .collect();

    let predictor = ResolutionPredictor::new(&state.model);
    let issues = predictor
        .predict_table(&batch)?
        .into_iter()
        .map(|row| IssueForecast {
            issue: row.key,
            predicted_resolution_date: row.resolutiondate,
        })
        .collect();

    Ok(Json(ReleaseForecastResponse { now: date, issues }))
}

#[derive(Debug, Serialize)]
pub struct ReleaseForecastResponse {
    pub now: String,
    pub issues: Vec<IssueForecast>,
}

#[derive(Debug, Serialize)]
pub struct IssueForecast {
    pub issue: String,
    pub predicted_resolution_date: Option<String>,
}

/// Parse the release cutoff: a bare date reads as its midnight
fn parse_cutoff(date: &str) -> Result<NaiveDateTime> {
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S") {
        return Ok(timestamp);
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .ok_or_else(|| AppError::Validation(format!("malformed release date: {date:?}")))
}
