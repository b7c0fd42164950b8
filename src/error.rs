// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- Error

/// Failure taxonomy for every mutating and read operation.
///
/// `Validation` means the caller must fix the request, `Conflict` means the
/// same request may succeed if retried, `Persistence` is an infrastructure
/// failure whose detail is logged but never surfaced to the caller.
#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("{0}")]
    Validation(String),

    #[error("User not authenticated.")]
    Unauthenticated,

    #[error("You don't have permission to perform this action.")]
    Forbidden,

    #[error("{0} not found.")]
    NotFound(&'static str),

    /// The per-auction write turn could not be acquired in time, or the
    /// store reported a conflicting concurrent write.
    #[error("The auction is busy right now, please try again.")]
    Conflict,

    #[error("storage failure: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for AuctionError {
    fn from(err: sqlx::Error) -> Self {
        AuctionError::Persistence(err.to_string())
    }
}

impl IntoResponse for AuctionError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuctionError::Validation(_) => StatusCode::BAD_REQUEST,
            AuctionError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuctionError::Forbidden => StatusCode::FORBIDDEN,
            AuctionError::NotFound(_) => StatusCode::NOT_FOUND,
            AuctionError::Conflict => StatusCode::CONFLICT,
            AuctionError::Persistence(detail) => {
                error!("{:<12} --> storage failure: {}", "Error", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            AuctionError::Persistence(_) => {
                "An unexpected error occurred, please try again later.".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(serde_json::json!({ "success": false, "message": message })),
        )
            .into_response()
    }
}

// endregion: --- Error
