// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("API key not configured for user")]
    MissingApiKey,

    #[error("Cannot access another user's resources")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Per-minute quota exceeded, retry after {retry_after_seconds}s")]
    MinuteQuotaExceeded { retry_after_seconds: u64 },

    #[error("Daily quota exceeded ({used}/{limit})")]
    DailyQuotaExceeded { used: u32, limit: u32 },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl ErrorResponse {
    fn new(error: &str, details: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            details,
            retry_after_seconds: None,
            used: None,
            limit: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("invalid_input", Some(msg.clone())),
            ),
            AppError::MissingApiKey => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(
                    "missing_api_key",
                    Some("Authenticate and provide an API key first".to_string()),
                ),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, ErrorResponse::new("forbidden", None)),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("not_found", Some(msg.clone())),
            ),
            AppError::MinuteQuotaExceeded {
                retry_after_seconds,
            } => {
                let mut body = ErrorResponse::new("minute_quota_exceeded", None);
                body.retry_after_seconds = Some(*retry_after_seconds);
                (StatusCode::TOO_MANY_REQUESTS, body)
            }
            AppError::DailyQuotaExceeded { used, limit } => {
                let mut body = ErrorResponse::new("daily_quota_exceeded", None);
                body.used = Some(*used);
                body.limit = Some(*limit);
                (StatusCode::TOO_MANY_REQUESTS, body)
            }
            AppError::Backend(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new("backend_error", Some(msg.clone())),
            ),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal_error", None),
                )
            }
        };

        let mut response = (status, Json(body)).into_response();

        if let AppError::MinuteQuotaExceeded {
            retry_after_seconds,
        } = &self
        {
            if let Ok(value) = retry_after_seconds.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::MissingApiKey.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Backend("boom".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_minute_quota_carries_retry_after_header() {
        let response = AppError::MinuteQuotaExceeded {
            retry_after_seconds: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_daily_quota_maps_to_429() {
        let response = AppError::DailyQuotaExceeded {
            used: 180,
            limit: 180,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
