// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::AssistanceResponse,
    notify::dispatch_emergency_alert,
    state::AppState,
    storage::UserRepository,
};

/// Alert every emergency contact of the caller.
///
/// Per-contact delivery failures are returned in `errors`; they do not fail
/// the request.
#[utoipa::path(
    post,
    path = "/api/v1/assistance",
    tag = "Assistance",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Alerts dispatched", body = AssistanceResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "No emergency contacts on file"),
    )
)]
pub async fn request_assistance(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<AssistanceResponse>, ApiError> {
    let stored = UserRepository::new(state.store.as_ref())
        .get(&user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if stored.emergency_contacts.is_empty() {
        return Err(ApiError::not_found("No emergency contacts found"));
    }

    let errors =
        dispatch_emergency_alert(state.notifier.as_ref(), &stored.name, &stored.emergency_contacts)
            .await;
    let delivered = stored.emergency_contacts.len() - errors.len();

    Ok(Json(AssistanceResponse {
        message: format!(
            "Emergency alert sent to {delivered} of {} contacts",
            stored.emergency_contacts.len()
        ),
        errors,
    }))
}
