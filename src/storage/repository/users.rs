// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Users double as the credential store: each document carries the argon2
//! password hash next to the profile. Emails are stored trimmed and
//! lowercased, and lookups normalize the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::collections::USERS;
use super::{from_document, to_document};
use crate::auth::Role;
use crate::storage::{Document, DocumentStore, Filter, StorageResult};

/// Someone to alert when the patient asks for assistance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EmergencyContact {
    pub name: String,
    pub relation: String,
    /// E.164 phone number.
    pub phone: String,
}

/// User document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

/// Fields for a new user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub emergency_contacts: Vec<EmergencyContact>,
}

/// Partial profile update; `None` leaves a field untouched. The role is
/// fixed at registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contacts: Option<Vec<EmergencyContact>>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: &str) -> StorageResult<Option<StoredUser>> {
        self.store
            .find_one(USERS, &Filter::eq("_id", user_id))
            .await?
            .map(|document| from_document(USERS, document))
            .transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        self.store
            .find_one(USERS, &Filter::eq("email", normalize_email(email)))
            .await?
            .map(|document| from_document(USERS, document))
            .transpose()
    }

    /// Insert a new user. Email uniqueness is the caller's check.
    pub async fn create(&self, new_user: NewUser, created_at: DateTime<Utc>) -> StorageResult<StoredUser> {
        let user = StoredUser {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: new_user.name,
            email: normalize_email(&new_user.email),
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at,
            emergency_contacts: new_user.emergency_contacts,
        };
        self.store
            .insert_one(USERS, to_document(USERS, &user)?)
            .await?;
        Ok(user)
    }

    /// Apply a profile update. Returns `false` when the user does not exist.
    pub async fn update(&self, user_id: &str, update: &UserUpdate) -> StorageResult<bool> {
        let changes: Document = to_document(USERS, update)?;
        if changes.is_empty() {
            return Ok(self.get(user_id).await?.is_some());
        }
        let outcome = self
            .store
            .update_one(USERS, &Filter::eq("_id", user_id), changes)
            .await?;
        Ok(outcome.matched)
    }

    /// Delete a user. Refresh tokens and detections are left in place.
    pub async fn delete(&self, user_id: &str) -> StorageResult<bool> {
        self.store
            .delete_one(USERS, &Filter::eq("_id", Value::from(user_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDocumentStore;
    use chrono::TimeZone;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Asha".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role: Role::Patient,
            emergency_contacts: vec![EmergencyContact {
                name: "Ravi".to_string(),
                relation: "brother".to_string(),
                phone: "+15550100".to_string(),
            }],
        }
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 16, 4, 27, 20).unwrap()
    }

    #[tokio::test]
    async fn create_and_find_by_normalized_email() {
        let store = InMemoryDocumentStore::new();
        let repo = UserRepository::new(&store);

        let user = repo.create(new_user(" Asha@Example.com "), created_at()).await.unwrap();
        assert_eq!(user.email, "asha@example.com");

        let found = repo.find_by_email("ASHA@example.com").await.unwrap().unwrap();
        assert_eq!(found, user);

        let by_id = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.emergency_contacts.len(), 1);
    }

    #[tokio::test]
    async fn update_only_touches_given_fields() {
        let store = InMemoryDocumentStore::new();
        let repo = UserRepository::new(&store);
        let user = repo.create(new_user("a@example.com"), created_at()).await.unwrap();

        let matched = repo
            .update(
                &user.id,
                &UserUpdate {
                    name: Some("Asha K".to_string()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(matched);

        let updated = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Asha K");
        assert_eq!(updated.emergency_contacts, user.emergency_contacts);
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_users() {
        let store = InMemoryDocumentStore::new();
        let repo = UserRepository::new(&store);

        assert!(!repo.update("nobody", &UserUpdate::default()).await.unwrap());
        assert!(!repo.delete("nobody").await.unwrap());

        let user = repo.create(new_user("a@example.com"), created_at()).await.unwrap();
        assert!(repo.delete(&user.id).await.unwrap());
        assert!(repo.get(&user.id).await.unwrap().is_none());
    }
}
