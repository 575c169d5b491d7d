//! Health check handlers
//!
//! - `/health`: every check, 503 when any is unhealthy
//! - `/health/live`: no checks, 200 while the process serves requests
//! - `/health/ready`: checks that gate traffic (the persistence gateway)

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{repository::Repository, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Outcome of one check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub name: String,
    pub status: HealthStatus,
    pub description: String,
    pub duration_ms: u64,
}

/// Health report body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub version: String,
    pub checks: Vec<CheckResult>,
}

impl HealthReport {
    fn new(state: &AppState, checks: Vec<CheckResult>) -> Self {
        let status = if checks.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        Self {
            status,
            timestamp: Utc::now(),
            service: state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
        }
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> axum::response::Response {
        let status = match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(self)).into_response()
    }
}

fn self_check() -> CheckResult {
    CheckResult {
        name: "self".to_string(),
        status: HealthStatus::Healthy,
        description: "Service is running".to_string(),
        duration_ms: 0,
    }
}

/// Probe every gateway the service depends on
async fn database_check(state: &AppState) -> CheckResult {
    let started = Instant::now();
    let backend = state.motorcycles().backend();

    let outcome = async {
        state.motorcycles().ping().await?;
        state.portals().ping().await?;
        state.users().ping().await
    }
    .await;

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match outcome {
        Ok(()) => CheckResult {
            name: "database".to_string(),
            status: HealthStatus::Healthy,
            description: format!("Storage reachable ({backend})"),
            duration_ms,
        },
        Err(e) => {
            tracing::error!(backend, error = %e, "Database health check failed");
            CheckResult {
                name: "database".to_string(),
                status: HealthStatus::Unhealthy,
                description: format!("Storage unreachable ({backend})"),
                duration_ms,
            }
        }
    }
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> HealthReport {
    let checks = vec![self_check(), database_check(&state).await];
    HealthReport::new(&state, checks)
}

/// `GET /health/live` (liveness probe)
pub async fn liveness(State(state): State<AppState>) -> HealthReport {
    HealthReport::new(&state, Vec::new())
}

/// `GET /health/ready` (readiness probe)
pub async fn readiness(State(state): State<AppState>) -> HealthReport {
    let checks = vec![database_check(&state).await];
    HealthReport::new(&state, checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_memory_backend_is_healthy() {
        let state = AppState::in_memory(Config::default()).unwrap();
        let report = health(State(state)).await;

        assert_eq!(report.status, HealthStatus::Healthy);
        let names: Vec<_> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["self", "database"]);
    }

    #[tokio::test]
    async fn test_liveness_runs_no_checks() {
        let state = AppState::in_memory(Config::default()).unwrap();
        let report = liveness(State(state)).await;
        assert!(report.checks.is_empty());
        assert_eq!(report.into_response().status(), StatusCode::OK);
    }

    #[test]
    fn test_unhealthy_check_fails_report() {
        let state = AppState::in_memory(Config::default()).unwrap();
        let mut failing = self_check();
        failing.status = HealthStatus::Unhealthy;

        let report = HealthReport::new(&state, vec![self_check(), failing]);
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(
            report.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
