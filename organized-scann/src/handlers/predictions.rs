//! Maintenance prediction endpoints (authenticated)

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use super::extract::ValidJson;
use crate::auth::Identity;
use crate::error::Result;
use crate::models::not_blank;
use crate::prediction::{analyze_patterns, estimate, Estimate, PatternReport, Sample};
use crate::repository::{Predicate, Repository};
use crate::state::AppState;

/// Body of `POST /api/v1/predictions/maintenance-time`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MaintenanceTimeRequest {
    #[validate(range(min = 1950, max = 2100, message = "must be between 1950 and 2100"))]
    pub year: i32,

    #[validate(custom(function = "not_blank"))]
    pub brand: String,
}

async fn training_samples(state: &AppState) -> Result<Vec<Sample>> {
    let motorcycles = state.motorcycles().fetch(&Predicate::all(), None).await?;
    Ok(motorcycles.iter().filter_map(Sample::from_motorcycle).collect())
}

pub async fn maintenance_time(
    State(state): State<AppState>,
    identity: Identity,
    ValidJson(request): ValidJson<MaintenanceTimeRequest>,
) -> Result<Json<Estimate>> {
    let samples = training_samples(&state).await?;
    let estimate = estimate(&samples, request.year, &request.brand, Utc::now())?;

    tracing::info!(
        user_id = identity.user_id,
        samples = samples.len(),
        predicted_days = estimate.predicted_days,
        "Estimated maintenance time"
    );
    Ok(Json(estimate))
}

pub async fn maintenance_patterns(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<PatternReport>> {
    let samples = training_samples(&state).await?;
    let report = analyze_patterns(&samples)?;

    tracing::info!(
        user_id = identity.user_id,
        samples = report.total_motorcycles,
        "Analyzed maintenance patterns"
    );
    Ok(Json(report))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/predictions/maintenance-time",
            post(maintenance_time),
        )
        .route(
            "/api/v1/predictions/maintenance-patterns",
            post(maintenance_patterns).get(maintenance_patterns),
        )
}
