// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::{Auth, Registration},
    error::ApiError,
    models::{CreateUserRequest, UpdateUserRequest, UserResponse},
    state::AppState,
    storage::{StoredUser, UserRepository, UserUpdate},
};

async fn load_user(state: &AppState, user_id: &str) -> Result<StoredUser, ApiError> {
    UserRepository::new(state.store.as_ref())
        .get(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// Register a new user.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    tag = "Users",
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Email already registered or fields missing"),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    if !request.email.contains('@') {
        return Err(ApiError::bad_request("email is not valid"));
    }
    if request.password.is_empty() {
        return Err(ApiError::bad_request("password must not be empty"));
    }

    let user = state
        .sessions
        .register(Registration {
            name: request.name,
            email: request.email,
            password: request.password,
            role: request.role,
            emergency_contacts: request.emergency_contacts,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Get the current authenticated user's profile.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(load_user(&state, &user.user_id).await?.into()))
}

/// Update the current user's name or emergency contacts.
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    request_body = UpdateUserRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "User no longer exists"),
    )
)]
pub async fn update_current_user(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if request.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let update = UserUpdate::from(request);
    let matched = UserRepository::new(state.store.as_ref())
        .update(&user.user_id, &update)
        .await?;
    if !matched {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = %user.user_id, "profile updated");

    Ok(Json(load_user(&state, &user.user_id).await?.into()))
}

/// Delete the current user. Detection history is kept.
#[utoipa::path(
    delete,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "User no longer exists"),
    )
)]
pub async fn delete_current_user(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<StatusCode, ApiError> {
    let deleted = UserRepository::new(state.store.as_ref())
        .delete(&user.user_id)
        .await?;
    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = %user.user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
