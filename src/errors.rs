use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Standard JSON error body returned by every handler.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Offending field for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error on {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Gateway error: {0}")]
    GatewayError(String),

    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("Invalid payment status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Concurrent modification of order {0}")]
    ConcurrentModification(i64),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ValidationError { .. }
            | ServiceError::EmptyCart
            | ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::SignatureVerificationFailed(_) => StatusCode::UNAUTHORIZED,
            ServiceError::GatewayError(_) => StatusCode::BAD_GATEWAY,
            ServiceError::InvalidTransition { .. } | ServiceError::ConcurrentModification(_) => {
                StatusCode::CONFLICT
            }
            ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn field(&self) -> Option<String> {
        match self {
            ServiceError::ValidationError { field, .. } => Some(field.clone()),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Surface the first field-level failure; the rest show up on retry.
        for (field, field_errors) in errors.field_errors() {
            if let Some(error) = field_errors.first() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value for {}", field));
                return ServiceError::validation(field.to_string(), message);
            }
        }
        ServiceError::InvalidInput("validation failed".to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.to_string(),
            field: self.field(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let err = ServiceError::validation("email", "Email is required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.field().as_deref(), Some("email"));
    }

    #[test]
    fn signature_failures_map_to_unauthorized() {
        let err = ServiceError::SignatureVerificationFailed("digest mismatch".into());
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn gateway_failures_map_to_bad_gateway() {
        let err = ServiceError::GatewayError("http client: bad TLS config".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
