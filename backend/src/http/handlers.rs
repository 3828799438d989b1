//! HTTP handlers for the REST API.
//!
//! Both write endpoints check the shared secret before looking at the request
//! body or query, so an unauthorized call has no effect.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use chrono::Utc;

use super::dto::{AddBidRequest, AddBidResponse, HealthResponse, ReportQuery, ReportTriggerResponse};
use super::error::AppError;
use super::state::AppState;
use crate::api::{parse_report_date, REPORT_DATE_FORMAT};
use crate::services::{RunOptions, RunOutcome};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let credential = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if state.is_authorized(credential) {
        Ok(())
    } else {
        tracing::warn!("Rejected request with missing or invalid credential");
        Err(AppError::Unauthorized)
    }
}

/// GET /health
///
/// Health check endpoint to verify the service is running and the bid store
/// is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    }))
}

/// POST /add_bid/
///
/// Store one bid event.
pub async fn add_bid(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AddBidRequest>, JsonRejection>,
) -> HandlerResult<AddBidResponse> {
    authorize(&state, &headers)?;

    let Json(request) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let bid = request.into_new_bid().map_err(AppError::Validation)?;

    let id = state.repository.insert_bid(&bid).await?;
    tracing::info!(
        id = id.value(),
        bid_id = %bid.bid_id,
        branch = %bid.branch,
        "Stored bid"
    );

    Ok(Json(AddBidResponse {
        status: "ok".to_string(),
        id: id.value(),
    }))
}

/// GET /send_report_now/?report_date=YYYY-MM-DD&dry_run=bool
///
/// Build and send the report for one day and wait for the attempt to finish.
/// A delivery failure still answers `ok`: the file was written and its path
/// is returned.
pub async fn send_report_now(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> HandlerResult<ReportTriggerResponse> {
    authorize(&state, &headers)?;

    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let date = match query.report_date.as_deref() {
        Some(value) if !value.trim().is_empty() => {
            parse_report_date(value).map_err(AppError::BadRequest)?
        }
        _ => Utc::now().date_naive(),
    };

    tracing::info!(%date, dry_run = query.dry_run, "On-demand report requested");
    let outcome = state
        .job
        .run(date, RunOptions { dry_run: query.dry_run })
        .await?;

    let delivery_error = match &outcome {
        RunOutcome::DeliveryFailed { error, .. } => Some(error.clone()),
        _ => None,
    };

    Ok(Json(ReportTriggerResponse {
        status: "ok".to_string(),
        message: outcome.message().to_string(),
        report_date: date.format(REPORT_DATE_FORMAT).to_string(),
        file: outcome.path().map(|p| p.display().to_string()),
        checksum: outcome.checksum().map(str::to_string),
        delivery_error,
    }))
}
