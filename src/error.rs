// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::analysis::AnalysisError;
use crate::auth::AuthError;
use crate::detection::DetectionError;
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        if error.is_timeout() {
            tracing::warn!(error = %error, "store call timed out");
            ApiError::gateway_timeout("Database operation timed out")
        } else {
            tracing::error!(error = %error, "store call failed");
            ApiError::internal("Database operation failed")
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!(error = %error, code = error.error_code(), "authentication failed");
        }
        ApiError::new(status, error.public_message())
    }
}

impl From<AnalysisError> for ApiError {
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::InsufficientData(detail) => ApiError::bad_request(detail),
            AnalysisError::ClassifierUnavailable => {
                ApiError::service_unavailable(error.to_string())
            }
            AnalysisError::UpstreamTimeout(_) => {
                tracing::warn!(error = %error, "classifier timed out");
                ApiError::gateway_timeout(error.to_string())
            }
            AnalysisError::Classifier(_) | AnalysisError::InvalidClassifierOutput(_) => {
                tracing::error!(error = %error, "classifier failed");
                ApiError::bad_gateway("Speech classifier failed")
            }
        }
    }
}

impl From<DetectionError> for ApiError {
    fn from(error: DetectionError) -> Self {
        match error {
            // Verdicts come from the engines, never from the caller.
            DetectionError::InvalidVerdict(detail) => {
                tracing::error!(detail = %detail, "engine produced an invalid verdict");
                ApiError::bad_gateway("Analysis produced an invalid result")
            }
            DetectionError::Persistence(e) => e.into(),
        }
    }
}
