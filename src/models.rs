// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Every type derives
//! `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Auth**: login, refresh and logout bodies
//! - **Users**: registration and profile
//! - **Analysis**: screening results wrapped around the persisted record
//! - **Patients**: clinical profile
//! - **Assistance**: emergency alert outcome

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::analysis::BalanceFeatures;
use crate::auth::Role;
use crate::detection::DetectionRecord;
use crate::notify::DeliveryFailure;
use crate::storage::{
    Bmi, EmergencyContact, MedicalHistoryEntry, StoredPatient, StoredUser, UserUpdate,
};

// =============================================================================
// Generic
// =============================================================================

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for refresh and logout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Recorded on the account and echoed in tokens and profiles. No
    /// endpoint grants or withholds anything by role.
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

/// Profile fields a user may change on themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub emergency_contacts: Option<Vec<EmergencyContact>>,
}

impl From<UpdateUserRequest> for UserUpdate {
    fn from(request: UpdateUserRequest) -> Self {
        UserUpdate {
            name: request.name,
            emergency_contacts: request.emergency_contacts,
        }
    }
}

/// A user as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub emergency_contacts: Vec<EmergencyContact>,
}

impl From<StoredUser> for UserResponse {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            emergency_contacts: user.emergency_contacts,
        }
    }
}

// =============================================================================
// Patients
// =============================================================================

/// Profile as returned after a submission. Binary fields are omitted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PatientResponse {
    pub id: String,
    pub user_id: String,
    pub bmi: Bmi,
    pub medical_history: Vec<MedicalHistoryEntry>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredPatient> for PatientResponse {
    fn from(patient: StoredPatient) -> Self {
        Self {
            id: patient.id,
            user_id: patient.user_id,
            bmi: patient.profile.bmi,
            medical_history: patient.profile.medical_history,
            updated_at: patient.updated_at,
        }
    }
}

/// Full profile, with the photo and voice sample base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PatientProfileResponse {
    pub id: String,
    pub user_id: String,
    pub bmi: Bmi,
    pub medical_history: Vec<MedicalHistoryEntry>,
    pub photo: String,
    pub voice_sample: String,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredPatient> for PatientProfileResponse {
    fn from(patient: StoredPatient) -> Self {
        Self {
            id: patient.id,
            user_id: patient.user_id,
            photo: STANDARD.encode(&patient.profile.photo),
            voice_sample: STANDARD.encode(&patient.profile.voice_sample),
            bmi: patient.profile.bmi,
            medical_history: patient.profile.medical_history,
            updated_at: patient.updated_at,
        }
    }
}

// =============================================================================
// Analysis
// =============================================================================

/// Balance result: the persisted record plus the rounded features behind it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceAnalysisResponse {
    pub features: BalanceFeatures,
    /// Features that exceeded their threshold.
    pub exceeded: Vec<String>,
    pub detection: DetectionRecord,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of records (default 50, capped at 200).
    pub limit: Option<usize>,
}

// =============================================================================
// Assistance
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssistanceResponse {
    pub message: String,
    /// Contacts that could not be reached.
    pub errors: Vec<DeliveryFailure>,
}
