use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use nt_db::StoreError;

/// Error returned by every handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYMENT_REQUIRED, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::not_found(err.to_string()),
            StoreError::NotOwner { .. } => Self::forbidden(err.to_string()),
            StoreError::InsufficientBalance { .. } => Self::payment_required(err.to_string()),
            StoreError::InvalidTransition { .. } | StoreError::Conflict(_) => {
                Self::conflict(err.to_string())
            }
            StoreError::Validation(message) => Self::bad_request(message),
            StoreError::Storage(_) | StoreError::Corrupt(_) | StoreError::LockPoisoned => {
                error!("store failure: {}", err);
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_types::models::RequestStatus;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::NotFound { entity: "tag", key: "x".into() }, StatusCode::NOT_FOUND),
            (
                StoreError::InsufficientBalance { required: 50, available: 40 },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                StoreError::InvalidTransition {
                    from: RequestStatus::Accepted,
                    to: RequestStatus::Declined,
                },
                StatusCode::CONFLICT,
            ),
            (StoreError::Conflict("dup".into()), StatusCode::CONFLICT),
            (
                StoreError::NotOwner {
                    entity: "tag",
                    key: "tag-1".into(),
                    name: "Ada".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (StoreError::Validation("title is required".into()), StatusCode::BAD_REQUEST),
            (StoreError::LockPoisoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(StoreError::LockPoisoned);
        assert_eq!(err.message, "internal server error");
    }
}
