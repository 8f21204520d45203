// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Screening endpoints and detection history.
//!
//! Each analysis handler runs its engine, then hands the verdict to the
//! aggregator, which stamps and persists it. The caller's email is recorded
//! as the username.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use utoipa::ToSchema;

use crate::{
    analysis::{GazeTally, MotionSample},
    auth::Auth,
    detection::{DetectionRecord, Modality, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT},
    error::ApiError,
    models::{BalanceAnalysisResponse, HistoryQuery},
    state::AppState,
};

/// Name of the multipart field carrying the audio.
pub const AUDIO_FIELD: &str = "file";

/// Multipart body of `analyze_speech`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct SpeechUpload {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Run the balance rule over a motion sample and record the verdict.
#[utoipa::path(
    post,
    path = "/api/v1/analyze_balance",
    request_body = MotionSample,
    tag = "Detection",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Recorded balance verdict", body = BalanceAnalysisResponse),
        (status = 400, description = "Sample too short or channels mismatched"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn analyze_balance(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(sample): Json<MotionSample>,
) -> Result<Json<BalanceAnalysisResponse>, ApiError> {
    let (report, verdict) = state.balance.analyze(&sample)?;
    let detection = state
        .detections
        .record(&user.user_id, &user.email, Modality::Balance, verdict)
        .await?;

    Ok(Json(BalanceAnalysisResponse {
        features: report.features,
        exceeded: report.exceeded,
        detection,
    }))
}

/// Classify an audio upload and record the verdict.
#[utoipa::path(
    post,
    path = "/api/v1/analyze_speech",
    request_body(content = SpeechUpload, content_type = "multipart/form-data"),
    tag = "Detection",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Recorded speech verdict", body = DetectionRecord),
        (status = 400, description = "Missing or empty audio"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 502, description = "Classifier failed"),
        (status = 503, description = "Classifier not configured"),
        (status = 504, description = "Classifier timed out"),
    )
)]
pub async fn analyze_speech(
    State(state): State<AppState>,
    Auth(user): Auth,
    mut multipart: Multipart,
) -> Result<Json<DetectionRecord>, ApiError> {
    let mut audio = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some(AUDIO_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
            audio = Some(bytes.to_vec());
            break;
        }
    }
    let audio = audio.ok_or_else(|| {
        ApiError::bad_request(format!("multipart field `{AUDIO_FIELD}` is required"))
    })?;

    let verdict = state.speech.analyze(audio).await?;
    let detection = state
        .detections
        .record(&user.user_id, &user.email, Modality::SlurredSpeech, verdict)
        .await?;
    Ok(Json(detection))
}

/// Record the outcome of a client-side gaze test.
#[utoipa::path(
    post,
    path = "/api/v1/analyze_eye",
    request_body = GazeTally,
    tag = "Detection",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Recorded eye verdict", body = DetectionRecord),
        (status = 400, description = "Impossible tally"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn analyze_eye(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(tally): Json<GazeTally>,
) -> Result<Json<DetectionRecord>, ApiError> {
    let verdict = tally.verdict()?;
    let detection = state
        .detections
        .record(&user.user_id, &user.email, Modality::Eye, verdict)
        .await?;
    Ok(Json(detection))
}

/// The caller's detections, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/detections/history",
    params(HistoryQuery),
    tag = "Detection",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Detection history", body = [DetectionRecord]),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn detection_history(
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DetectionRecord>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let records = state
        .detections
        .history(&user.user_id, limit)
        .await?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(records))
}
