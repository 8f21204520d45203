// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints.

use axum::{extract::State, Json};

use crate::{
    auth::{AccessGrant, Auth, AuthError, LoginSession},
    models::{LoginRequest, MessageResponse, RefreshTokenRequest},
    state::AppState,
};

/// Exchange email and password for an access/refresh token pair.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Session issued", body = LoginSession),
        (status = 401, description = "Invalid email or password"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginSession>, AuthError> {
    let session = state.sessions.login(&request.email, &request.password).await?;
    Ok(Json(session))
}

/// Mint a fresh access token from a refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "New access token", body = AccessGrant),
        (status = 401, description = "Refresh token invalid, expired or revoked"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<AccessGrant>, AuthError> {
    let grant = state.sessions.refresh(&request.refresh_token).await?;
    Ok(Json(grant))
}

/// Revoke the caller's refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    request_body = RefreshTokenRequest,
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Refresh token revoked", body = MessageResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    state.sessions.logout(&user, &request.refresh_token).await?;
    Ok(Json(MessageResponse::new("Successfully logged out")))
}
