use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::duplicate::DuplicateCheck;
use crate::error::ApiError;
use crate::identity::identify;
use crate::metrics::{
    DUPLICATES_TOTAL, RATE_LIMITED_TOTAL, SAVED_TOTAL, STORE_ERRORS_TOTAL,
    VALIDATION_FAILURES_TOTAL,
};
use crate::models::{SaveTextRequest, StoredEntry};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Saved,
    DuplicateSuppressed,
}

/// Runs one submission through the admission gates and persists it.
///
/// validate -> identify -> rate limit -> duplicate check -> append.
/// Each gate can end the request early. Validation runs before the rate
/// limiter so a bad body never costs the client its slot.
pub async fn submit(
    state: &AppState,
    request: SaveTextRequest,
    source_address: &str,
    user_agent: &str,
) -> Result<SubmissionOutcome, ApiError> {
    let entry = request.validate().inspect_err(|e| {
        VALIDATION_FAILURES_TOTAL.inc();
        debug!(reason = %e, "rejected invalid submission");
    })?;

    let client = identify(source_address, user_agent);

    if !state.rate_limiter.admit(&client, Instant::now()) {
        RATE_LIMITED_TOTAL.inc();
        info!(%client, outcome = "rate_limited", "submission rejected");
        return Err(ApiError::RateLimited {
            cooldown: state.rate_limiter.cooldown(),
        });
    }

    match state.duplicate_guard.check(&entry, Utc::now()).await {
        DuplicateCheck::Duplicate => {
            DUPLICATES_TOTAL.inc();
            info!(%client, outcome = "duplicate", "submission not saved");
            return Ok(SubmissionOutcome::DuplicateSuppressed);
        }
        DuplicateCheck::CheckFailed(e) => {
            STORE_ERRORS_TOTAL.inc();
            warn!(error = %e, "duplicate check failed, treating entry as unique");
        }
        DuplicateCheck::Unique => {}
    }

    state
        .store
        .append(StoredEntry::new(entry, Utc::now()))
        .await
        .inspect_err(|_| STORE_ERRORS_TOTAL.inc())?;

    SAVED_TOTAL.inc();
    info!(%client, outcome = "saved", "submission saved");
    Ok(SubmissionOutcome::Saved)
}
