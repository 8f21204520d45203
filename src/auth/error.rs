// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

/// Message returned for every token failure. Callers never learn which check
/// rejected their credential.
pub const GENERIC_CREDENTIALS_MESSAGE: &str = "Could not validate credentials";

/// Authentication error type.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are deliberately merged.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Authorization header is required")]
    MissingAuthHeader,
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Bad signature, wrong algorithm, or wrong token kind.
    #[error("Token is invalid")]
    InvalidToken,
    #[error("Token has expired")]
    ExpiredToken,
    #[error("Token is malformed")]
    MalformedToken,
    /// Token subject no longer resolves to a user.
    #[error("Token subject does not exist")]
    UnknownSubject,
    /// Refresh token is unknown to the store or has been revoked.
    #[error("Refresh token has been revoked")]
    RevokedToken,
    #[error("Email already registered")]
    EmailAlreadyRegistered,
    #[error("Credential store failure: {0}")]
    Storage(#[from] StorageError),
    #[error("Internal authentication error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
}

impl AuthError {
    /// Stable code for logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownSubject => "unknown_subject",
            AuthError::RevokedToken => "revoked_token",
            AuthError::EmailAlreadyRegistered => "email_already_registered",
            AuthError::Storage(_) => "storage_error",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::MalformedToken
            | AuthError::UnknownSubject
            | AuthError::RevokedToken => StatusCode::UNAUTHORIZED,
            AuthError::EmailAlreadyRegistered => StatusCode::BAD_REQUEST,
            AuthError::Storage(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Storage(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials | AuthError::EmailAlreadyRegistered => self.to_string(),
            AuthError::Storage(e) if e.is_timeout() => "Database operation timed out".to_string(),
            AuthError::Storage(_) => "Database operation failed".to_string(),
            AuthError::Internal(_) => "Internal server error".to_string(),
            _ => GENERIC_CREDENTIALS_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "authentication failed");
        } else {
            tracing::debug!(error = %self, code = self.error_code(), "authentication rejected");
        }

        let mut response = (
            status,
            Json(AuthErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(error: AuthError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn token_failures_share_one_message() {
        for error in [
            AuthError::MissingAuthHeader,
            AuthError::InvalidToken,
            AuthError::ExpiredToken,
            AuthError::MalformedToken,
            AuthError::UnknownSubject,
            AuthError::RevokedToken,
        ] {
            let (status, body) = body_of(error).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], GENERIC_CREDENTIALS_MESSAGE);
        }
    }

    #[tokio::test]
    async fn invalid_credentials_has_its_own_message() {
        let (status, body) = body_of(AuthError::InvalidCredentials).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn storage_errors_map_to_server_statuses() {
        let (status, body) = body_of(AuthError::Storage(StorageError::Timeout {
            operation: "find_one",
        }))
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "Database operation timed out");

        let (status, body) =
            body_of(AuthError::Storage(StorageError::Unavailable("down".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Database operation failed");
    }

    #[test]
    fn duplicate_email_is_bad_request() {
        assert_eq!(
            AuthError::EmailAlreadyRegistered.status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
