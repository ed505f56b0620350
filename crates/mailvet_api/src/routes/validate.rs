//! Address validation route handlers
//!
//! A single `email` returns one result; an `emails` array returns the ordered
//! results plus a summary. Outcomes are stored for the owner afterwards when
//! `known_owner_id` is given.

use crate::{api_handler::*, AppState};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use mailvet_core::{BatchReport, ValidationResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// POST /v1/validate
#[instrument(skip_all, fields(request_id = %request_id.0))]
pub async fn validate_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|rejection| {
        let error = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: state.config.security.max_body_size_bytes,
            }
        } else {
            ApiError::InvalidRequest(rejection.body_text())
        };
        error.for_request(&request_id)
    })?;
    let owner_id = request.known_owner_id.as_deref();

    if let Some(email) = request.email {
        let result = validate_single(&state, &email, owner_id).await;
        return Ok(Json(result).into_response());
    }

    let Some(emails) = request.emails else {
        return Err(
            ApiError::InvalidRequest(MISSING_INPUT_MESSAGE.to_string()).for_request(&request_id)
        );
    };

    let limit = state.config.security.max_batch_size;
    if emails.len() > limit {
        return Err(ApiError::BatchTooLarge {
            size: emails.len(),
            limit,
        }
        .for_request(&request_id));
    }

    let report = validate_many(&state, &emails, owner_id).await;
    Ok(Json(report).into_response())
}

/// GET /v1/validate?email=user@example.com
#[instrument(skip_all, fields(request_id = %request_id.0))]
pub async fn validate_query_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    query: Result<Query<ValidateQuery>, QueryRejection>,
) -> ApiResult<Json<ValidationResult>> {
    let Query(query) = query.map_err(|rejection| {
        ApiError::InvalidRequest(rejection.body_text()).for_request(&request_id)
    })?;
    let Some(email) = query.email else {
        return Err(
            ApiError::InvalidRequest(MISSING_INPUT_MESSAGE.to_string()).for_request(&request_id)
        );
    };

    let result = validate_single(&state, &email, query.known_owner_id.as_deref()).await;
    Ok(Json(result))
}

async fn validate_single(state: &AppState, email: &str, owner_id: Option<&str>) -> ValidationResult {
    let start_time = Instant::now();
    let result = state.pipeline.validate_email(email, owner_id).await;

    if let Some(owner_id) = owner_id {
        state.result_cache.store(owner_id, &result);
    }

    info!(
        "Address validated in {:?}: {} -> {} ({})",
        start_time.elapsed(),
        state.pipeline.privacy().redact(&result.email),
        result.status,
        result.score
    );
    result
}

async fn validate_many(state: &AppState, emails: &[String], owner_id: Option<&str>) -> BatchReport {
    let start_time = Instant::now();
    let report = state.pipeline.validate_batch(emails, owner_id).await;

    if let Some(owner_id) = owner_id {
        let stored = report
            .results
            .iter()
            .filter(|result| state.result_cache.store(owner_id, result))
            .count();
        debug!("Stored {} of {} outcome(s) for owner", stored, report.results.len());
    }

    info!(
        "Batch of {} validated in {:?}: average score {:.1}",
        report.summary.total,
        start_time.elapsed(),
        report.summary.average_score
    );
    report
}
