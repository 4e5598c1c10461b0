//! `PUT /job`.
//!
//! Flow: content type check, body parse, admission, dry run, spawn, detach.
//! The caller gets 200 once fio is running; how the run ends is only
//! visible through `/metrics` and the logs.

use std::time::Instant;

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;

use fiorunner_core::error::{ClientCode, FioRunnerError, Result};
use fiorunner_core::job::JobRequest;

use crate::api::ApiError;
use crate::app_state::AppState;
use crate::job::{validate, FioRun};

pub async fn submit_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    match accept(&state, &headers, &body).await {
        Ok(()) => {
            state.metrics().job_submissions.inc(&[("outcome", "accepted")]);
            (
                StatusCode::OK,
                Json(json!({ "message": "job request received" })),
            )
                .into_response()
        }
        Err(e) => {
            let outcome = match &e {
                FioRunnerError::AdmissionConflict => "conflict",
                FioRunnerError::Validation { .. } => "invalid",
                e if e.client_code() == ClientCode::BadRequest => "bad_request",
                _ => "error",
            };
            state.metrics().job_submissions.inc(&[("outcome", outcome)]);
            match outcome {
                "error" => tracing::error!(error = %e, "job submission failed"),
                _ => tracing::info!(error = %e, outcome, "job submission rejected"),
            }
            ApiError(e).into_response()
        }
    }
}

async fn accept(
    state: &AppState,
    headers: &HeaderMap,
    body: &std::result::Result<Bytes, BytesRejection>,
) -> Result<()> {
    require_json(headers)?;
    // Covers bodies over `agent.max_body_bytes`.
    let body = body
        .as_ref()
        .map_err(|rejection| FioRunnerError::BadRequest(rejection.body_text()))?;
    let job = JobRequest::from_json_body(body)?;

    let permit = state
        .admission()
        .admit()
        .ok_or(FioRunnerError::AdmissionConflict)?;

    let fio = &state.cfg().fio;
    let started = Instant::now();
    let report = validate(fio, &job).await;
    state
        .metrics()
        .validation_duration
        .observe(&[], started.elapsed());
    report?.into_result()?;

    let run = FioRun::spawn(fio, &job, permit)?;
    state.store().begin_job();
    // Detached: the handle is dropped and the run releases admission itself.
    let _ = run.launch(state.store(), state.metrics());
    Ok(())
}

fn require_json(headers: &HeaderMap) -> Result<()> {
    let ct = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let mime = ct.split(';').next().unwrap_or("").trim();
    if mime.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else {
        Err(FioRunnerError::BadRequest(
            "Content-Type must be application/json".into(),
        ))
    }
}
