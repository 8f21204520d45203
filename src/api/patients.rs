// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Patient profile endpoints.

use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    Json,
};
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{PatientProfileResponse, PatientResponse},
    state::AppState,
    storage::{Bmi, MedicalHistoryEntry, PatientProfile, PatientRepository},
};

/// Multipart body of `submit_patient_profile`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct PatientUpload {
    #[schema(value_type = String, format = Binary)]
    photo: Vec<u8>,
    #[schema(value_type = String, format = Binary)]
    voice_sample: Vec<u8>,
    height_cm: f64,
    weight_kg: f64,
    /// JSON array of `{condition, diagnosed_at, notes}`. Defaults to `[]`.
    medical_history: Option<String>,
}

#[derive(Default)]
struct ProfileForm {
    photo: Option<Vec<u8>>,
    voice_sample: Option<Vec<u8>>,
    height_cm: Option<String>,
    weight_kg: Option<String>,
    medical_history: Option<String>,
}

impl ProfileForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "photo" => form.photo = Some(field_bytes(field).await?),
                "voice_sample" => form.voice_sample = Some(field_bytes(field).await?),
                "height_cm" => form.height_cm = Some(field_text(field).await?),
                "weight_kg" => form.weight_kg = Some(field_text(field).await?),
                "medical_history" => form.medical_history = Some(field_text(field).await?),
                _ => {}
            }
        }
        Ok(form)
    }

    fn into_profile(self) -> Result<PatientProfile, ApiError> {
        let photo = required_file("photo", self.photo)?;
        let voice_sample = required_file("voice_sample", self.voice_sample)?;
        let bmi = Bmi {
            height_cm: positive_number("height_cm", self.height_cm)?,
            weight_kg: positive_number("weight_kg", self.weight_kg)?,
        };
        let medical_history = match self.medical_history.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str::<Vec<MedicalHistoryEntry>>(raw).map_err(|_| {
                ApiError::bad_request("Invalid medical_history format. Must be JSON.")
            })?,
        };

        Ok(PatientProfile {
            photo,
            voice_sample,
            bmi,
            medical_history,
        })
    }
}

async fn field_bytes(field: Field<'_>) -> Result<Vec<u8>, ApiError> {
    field
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))
}

async fn field_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read form field: {e}")))
}

fn required_file(name: &str, value: Option<Vec<u8>>) -> Result<Vec<u8>, ApiError> {
    match value {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        Some(_) => Err(ApiError::bad_request(format!("`{name}` must not be empty"))),
        None => Err(ApiError::bad_request(format!("multipart field `{name}` is required"))),
    }
}

fn positive_number(name: &str, value: Option<String>) -> Result<f64, ApiError> {
    let raw = value
        .ok_or_else(|| ApiError::bad_request(format!("multipart field `{name}` is required")))?;
    match raw.trim().parse::<f64>() {
        Ok(number) if number.is_finite() && number > 0.0 => Ok(number),
        _ => Err(ApiError::bad_request(format!("`{name}` must be a positive number"))),
    }
}

/// Create or replace the caller's patient profile.
///
/// Answers 201 when the profile is new and 200 when an existing one was
/// overwritten. The profile keeps its id across submissions.
#[utoipa::path(
    post,
    path = "/api/v1/patients",
    request_body(content = PatientUpload, content_type = "multipart/form-data"),
    tag = "Patients",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Profile created", body = PatientResponse),
        (status = 200, description = "Profile updated", body = PatientResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn submit_patient_profile(
    State(state): State<AppState>,
    Auth(user): Auth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PatientResponse>), ApiError> {
    let profile = ProfileForm::read(multipart).await?.into_profile()?;

    let upsert = PatientRepository::new(state.store.as_ref())
        .upsert(&user.user_id, profile, state.clock.now())
        .await?;
    tracing::info!(
        user_id = %user.user_id,
        created = upsert.created,
        "patient profile saved"
    );

    let status = if upsert.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(upsert.patient.into())))
}

/// The caller's patient profile.
#[utoipa::path(
    get,
    path = "/api/v1/patients/me",
    tag = "Patients",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Patient profile", body = PatientProfileResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "No profile submitted yet"),
    )
)]
pub async fn get_patient_profile(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<PatientProfileResponse>, ApiError> {
    let patient = PatientRepository::new(state.store.as_ref())
        .get(&user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Patient profile not found"))?;
    Ok(Json(patient.into()))
}
