use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::identity::{client_address, user_agent};
use crate::metrics::{REQUEST_LATENCY, SUBMISSIONS_TOTAL, VALIDATION_FAILURES_TOTAL};
use crate::models::{SaveTextRequest, SaveTextResponse};
use crate::state::AppState;
use crate::submission::{SubmissionOutcome, submit};

// POST /api/save-text
pub async fn save_text_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<SaveTextRequest>, JsonRejection>,
) -> Result<Json<SaveTextResponse>, ApiError> {
    SUBMISSIONS_TOTAL.inc();
    let start_time = Instant::now();

    let result = match payload {
        Ok(Json(request)) => {
            let address = client_address(&headers, peer, state.trust_forwarded);
            submit(&state, request, &address, user_agent(&headers)).await
        }
        Err(rejection) => Err(rejected(rejection)),
    };

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match result? {
        SubmissionOutcome::Saved => Ok(Json(SaveTextResponse::saved())),
        SubmissionOutcome::DuplicateSuppressed => Ok(Json(SaveTextResponse::duplicate())),
    }
}

fn rejected(rejection: JsonRejection) -> ApiError {
    let status = rejection.status();
    if counts_as_validation_failure(status) {
        VALIDATION_FAILURES_TOTAL.inc();
    }
    ApiError::Rejected {
        status,
        message: rejection.body_text(),
    }
}

// Well-formed JSON with a missing or mistyped `text` is a validation failure.
// Bad syntax (400) and a wrong content type (415) are not.
fn counts_as_validation_failure(status: StatusCode) -> bool {
    status == StatusCode::UNPROCESSABLE_ENTITY
}
