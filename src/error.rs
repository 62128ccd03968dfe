use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::Duration;
use tracing::error;

use crate::models::ValidationError;
use crate::store::StoreError;

// Everything the save-text endpoint can fail with. Duplicates are not here,
// they are a normal 200 response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // body could not be read as JSON / didn't match the request shape
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error(
        "Rate limit exceeded. Please wait {} seconds before submitting again.",
        .cooldown.as_secs()
    )]
    RateLimited { cooldown: Duration },

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Rejected { status, .. } => *status,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Store(e) => {
                // full cause stays in the log
                error!(error = %e, "save-text failed");
                (status, Json(json!({ "detail": "Internal server error" }))).into_response()
            }
            ApiError::RateLimited { cooldown } => {
                let mut res = (status, Json(json!({ "detail": self.to_string() }))).into_response();
                res.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(cooldown.as_secs()));
                res
            }
            _ => (status, Json(json!({ "detail": self.to_string() }))).into_response(),
        }
    }
}
