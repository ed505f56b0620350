//! Shared API types and utilities
//!
//! Request bodies, error responses and the request identifier carried through
//! every handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

pub const MISSING_INPUT_MESSAGE: &str = "Please provide an email or emails array";

/// Request identifier set by the request-id middleware
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Query parameters for GET /v1/validate
#[derive(Debug, Default, Deserialize)]
pub struct ValidateQuery {
    pub email: Option<String>,
    pub known_owner_id: Option<String>,
}

/// Request body for POST /v1/validate
///
/// `email` takes precedence when both `email` and `emails` are present.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    pub email: Option<String>,
    pub emails: Option<Vec<String>>,
    pub known_owner_id: Option<String>,
}

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    pub request_id: String,
    pub timestamp: String,
}

/// API error types
#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    BatchTooLarge { size: usize, limit: usize },
    PayloadTooLarge { limit: usize },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BatchTooLarge { .. } | ApiError::PayloadTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
            ApiError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::InvalidRequest(msg) => msg.clone(),
            ApiError::BatchTooLarge { size, limit } => {
                format!("Batch of {size} addresses exceeds the limit of {limit}")
            }
            ApiError::PayloadTooLarge { limit } => {
                format!("Request body exceeds the limit of {limit} bytes")
            }
        }
    }

    /// Attach the request identifier so the error body can be correlated
    pub fn for_request(self, request_id: &RequestId) -> ApiFailure {
        ApiFailure {
            error: self,
            request_id: request_id.0.clone(),
        }
    }
}

/// An [`ApiError`] bound to the request it failed
#[derive(Debug)]
pub struct ApiFailure {
    pub error: ApiError,
    pub request_id: String,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error.message(),
            error_code: self.error.error_code().to_string(),
            request_id: self.request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (self.error.status_code(), Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiFailure>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_deserialization() {
        let request: ValidateRequest = serde_json::from_str(
            r#"{"emails": ["a@example.com", "b@example.com"], "known_owner_id": "owner-1"}"#,
        )
        .unwrap();
        assert_eq!(request.email, None);
        assert_eq!(request.emails.map(|e| e.len()), Some(2));
        assert_eq!(request.known_owner_id, Some("owner-1".to_string()));

        let request: ValidateRequest = serde_json::from_str("{}").unwrap();
        assert!(request.email.is_none() && request.emails.is_none());
    }

    #[test]
    fn test_error_mapping() {
        let error = ApiError::InvalidRequest(MISSING_INPUT_MESSAGE.to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.error_code(), "INVALID_REQUEST");
        assert_eq!(error.message(), MISSING_INPUT_MESSAGE);

        let error = ApiError::BatchTooLarge { size: 11, limit: 10 };
        assert_eq!(error.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(error.message().contains("11"));

        let error = ApiError::PayloadTooLarge { limit: 1024 };
        assert_eq!(error.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(error.error_code(), "PAYLOAD_TOO_LARGE");
        assert!(error.message().contains("1024"));
    }

    #[test]
    fn test_failure_response_status() {
        let response = ApiError::InvalidRequest("bad".to_string())
            .for_request(&RequestId("req-1".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
