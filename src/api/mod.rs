// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    analysis::{BalanceFeatures, GazeTally, MotionSample},
    auth::{AccessGrant, LoginSession, Role, UserSummary},
    detection::{Classification, DetectionRecord, Modality, TestResult},
    models::{
        AssistanceResponse, BalanceAnalysisResponse, CreateUserRequest, LoginRequest,
        MessageResponse, PatientProfileResponse, PatientResponse, RefreshTokenRequest,
        UpdateUserRequest, UserResponse,
    },
    notify::DeliveryFailure,
    state::AppState,
    storage::{Bmi, EmergencyContact, MedicalHistoryEntry},
};

pub mod assistance;
pub mod auth;
pub mod detection;
pub mod health;
pub mod patients;
pub mod request_log;
pub mod users;

/// Upper bound on one audio upload.
pub const MAX_AUDIO_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Upper bound on a patient profile submission (photo plus voice sample).
pub const MAX_PROFILE_UPLOAD_BYTES: usize = 2 * MAX_AUDIO_UPLOAD_BYTES;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/users", post(users::create_user))
        .route(
            "/users/me",
            get(users::get_current_user)
                .put(users::update_current_user)
                .delete(users::delete_current_user),
        )
        .route("/analyze_balance", post(detection::analyze_balance))
        .route(
            "/analyze_speech",
            post(detection::analyze_speech).layer(DefaultBodyLimit::max(MAX_AUDIO_UPLOAD_BYTES)),
        )
        .route("/analyze_eye", post(detection::analyze_eye))
        .route("/detections/history", get(detection::detection_history))
        .route(
            "/patients",
            post(patients::submit_patient_profile)
                .layer(DefaultBodyLimit::max(MAX_PROFILE_UPLOAD_BYTES)),
        )
        .route("/patients/me", get(patients::get_patient_profile))
        .route("/assistance", post(assistance::request_assistance));

    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api/v1", v1_routes)
        .layer(middleware::from_fn_with_state(state.clone(), request_log::record))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[utoipa::path(
    get,
    path = "/ping",
    tag = "Health",
    responses((status = 200, body = MessageResponse))
)]
pub async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse::new("pong"))
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        ping,
        health::health,
        health::liveness,
        health::readiness,
        auth::login,
        auth::refresh,
        auth::logout,
        users::create_user,
        users::get_current_user,
        users::update_current_user,
        users::delete_current_user,
        detection::analyze_balance,
        detection::analyze_speech,
        detection::analyze_eye,
        detection::detection_history,
        patients::submit_patient_profile,
        patients::get_patient_profile,
        assistance::request_assistance
    ),
    components(
        schemas(
            MessageResponse,
            LoginRequest,
            RefreshTokenRequest,
            LoginSession,
            AccessGrant,
            UserSummary,
            Role,
            CreateUserRequest,
            UpdateUserRequest,
            UserResponse,
            EmergencyContact,
            MotionSample,
            BalanceFeatures,
            BalanceAnalysisResponse,
            GazeTally,
            Modality,
            Classification,
            TestResult,
            DetectionRecord,
            Bmi,
            MedicalHistoryEntry,
            PatientResponse,
            PatientProfileResponse,
            AssistanceResponse,
            DeliveryFailure,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Login, token refresh and logout"),
        (name = "Users", description = "Registration and profile"),
        (name = "Detection", description = "Screening tests and detection history"),
        (name = "Patients", description = "Clinical profile"),
        (name = "Assistance", description = "Emergency contact alerts")
    )
)]
struct ApiDoc;

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    pub async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        read(app.clone().oneshot(request).await.unwrap()).await
    }

    pub async fn read(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Register a patient and return an access token and the refresh token.
    pub async fn register_and_login(app: &Router, email: &str) -> (String, String) {
        let (status, _) = send(
            app,
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({
                "name": "Asha",
                "email": email,
                "password": "s3cret-pw",
                "emergency_contacts": [
                    {"name": "Ravi", "relation": "brother", "phone": "+15550001"}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, session) = send(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": email, "password": "s3cret-pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (
            session["access_token"].as_str().unwrap().to_string(),
            session["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}
