// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the document store.
//!
//! Each repository owns one collection and is the only place where that
//! collection's documents are converted to and from typed records.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{Document, StorageError, StorageResult};

pub mod detections;
pub mod patients;
pub mod refresh_tokens;
pub mod request_logs;
pub mod timestamp;
pub mod users;

pub use detections::{DetectionRepository, DetectionRows, StoredDetection, StoredVerdict};
pub use patients::{
    Bmi, MedicalHistoryEntry, PatientProfile, PatientRepository, PatientUpsert, StoredPatient,
};
pub use refresh_tokens::{RefreshTokenRepository, StoredRefreshToken};
pub use request_logs::{RequestLogRepository, StoredRequestLog};
pub use users::{EmergencyContact, NewUser, StoredUser, UserRepository, UserUpdate};

/// Collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const REFRESH_TOKENS: &str = "refresh_tokens";
    pub const DETECTIONS: &str = "detections";
    pub const LOGS: &str = "logs";
    pub const PATIENTS: &str = "patients";
}

/// Serialize a typed record into a store document.
pub(crate) fn to_document<T: Serialize>(collection: &str, record: &T) -> StorageResult<Document> {
    match serde_json::to_value(record)? {
        Value::Object(document) => Ok(document),
        _ => Err(StorageError::invalid_document(
            collection,
            "record did not serialize to an object",
        )),
    }
}

/// Deserialize a store document into a typed record.
pub(crate) fn from_document<T: DeserializeOwned>(
    collection: &str,
    document: Document,
) -> StorageResult<T> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| StorageError::invalid_document(collection, e))
}
