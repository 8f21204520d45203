// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Patient profile repository.
//!
//! One profile per user, keyed by `user_id`. A submission upserts: the first
//! one inserts the document, later ones rewrite its fields in place and keep
//! the `_id`. Photo and voice sample bytes are stored base64-encoded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::collections::PATIENTS;
use super::{from_document, to_document};
use crate::storage::{DocumentStore, Filter, StorageResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Bmi {
    pub height_cm: f64,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MedicalHistoryEntry {
    pub condition: String,
    pub diagnosed_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The fields a submission replaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    #[serde(with = "base64_bytes")]
    pub photo: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub voice_sample: Vec<u8>,
    pub bmi: Bmi,
    #[serde(default)]
    pub medical_history: Vec<MedicalHistoryEntry>,
}

/// Patient document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredPatient {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub profile: PatientProfile,
    pub updated_at: DateTime<Utc>,
}

/// Result of [`PatientRepository::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub struct PatientUpsert {
    pub patient: StoredPatient,
    /// `true` when no profile existed before this call.
    pub created: bool,
}

pub struct PatientRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> PatientRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: &str) -> StorageResult<Option<StoredPatient>> {
        self.store
            .find_one(PATIENTS, &Filter::eq("user_id", user_id))
            .await?
            .map(|document| from_document(PATIENTS, document))
            .transpose()
    }

    /// Insert the user's profile, or overwrite the existing one.
    pub async fn upsert(
        &self,
        user_id: &str,
        profile: PatientProfile,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<PatientUpsert> {
        let existing = self.get(user_id).await?;
        let mut created = existing.is_none();
        let patient = StoredPatient {
            id: existing
                .map(|patient| patient.id)
                .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
            user_id: user_id.to_string(),
            profile,
            updated_at,
        };
        let document = to_document(PATIENTS, &patient)?;

        if !created {
            let outcome = self
                .store
                .update_one(PATIENTS, &Filter::eq("user_id", user_id), document.clone())
                .await?;
            // Removed between the read and the write.
            created = !outcome.matched;
        }
        if created {
            self.store.insert_one(PATIENTS, document).await?;
        }

        Ok(PatientUpsert { patient, created })
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FindQuery, InMemoryDocumentStore};
    use chrono::{Duration, TimeZone};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 16, 4, 27, 20).unwrap()
    }

    fn profile(weight_kg: f64) -> PatientProfile {
        PatientProfile {
            photo: b"\x89PNG".to_vec(),
            voice_sample: b"RIFF".to_vec(),
            bmi: Bmi {
                height_cm: 170.0,
                weight_kg,
            },
            medical_history: vec![MedicalHistoryEntry {
                condition: "hypertension".to_string(),
                diagnosed_at: at() - Duration::days(400),
                notes: None,
            }],
        }
    }

    #[tokio::test]
    async fn second_submission_overwrites_the_first() {
        let store = InMemoryDocumentStore::new();
        let repo = PatientRepository::new(&store);

        let first = repo.upsert("u1", profile(70.0), at()).await.unwrap();
        assert!(first.created);

        let mut changed = profile(68.5);
        changed.medical_history.clear();
        let second = repo
            .upsert("u1", changed.clone(), at() + Duration::days(1))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.patient.id, first.patient.id);

        let all = store
            .find_many(PATIENTS, &FindQuery::new(Filter::all()))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        let stored = repo.get("u1").await.unwrap().unwrap();
        assert_eq!(stored, second.patient);
        assert_eq!(stored.profile, changed);
    }

    #[tokio::test]
    async fn repeated_identical_submission_is_idempotent() {
        let store = InMemoryDocumentStore::new();
        let repo = PatientRepository::new(&store);

        repo.upsert("u1", profile(70.0), at()).await.unwrap();
        repo.upsert("u1", profile(70.0), at()).await.unwrap();
        repo.upsert("u2", profile(80.0), at()).await.unwrap();

        let all = store
            .find_many(PATIENTS, &FindQuery::new(Filter::all()))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(repo.get("u1").await.unwrap().unwrap().profile, profile(70.0));
    }

    #[tokio::test]
    async fn binary_fields_are_stored_as_base64() {
        let store = InMemoryDocumentStore::new();
        PatientRepository::new(&store)
            .upsert("u1", profile(70.0), at())
            .await
            .unwrap();

        let document = store
            .find_one(PATIENTS, &Filter::eq("user_id", "u1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(document["photo"], "iVBORw==");
        assert_eq!(document["voice_sample"], "UklGRg==");
        assert_eq!(document["bmi"]["weight_kg"], 70.0);
    }

    #[tokio::test]
    async fn missing_profile_is_none() {
        let store = InMemoryDocumentStore::new();
        assert!(PatientRepository::new(&store).get("nobody").await.unwrap().is_none());
    }
}
