// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh token repository.
//!
//! One row per issued refresh token. Rows are inserted at login, only ever
//! mutated to set `revoked`, and never deleted, so the collection doubles as
//! an audit trail of sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::collections::REFRESH_TOKENS;
use super::{from_document, to_document};
use crate::storage::{Document, DocumentStore, Filter, StorageResult};

/// Refresh token record. The raw token is never stored, only its `jti`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRefreshToken {
    pub token_id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub revoked: bool,
}

pub struct RefreshTokenRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> RefreshTokenRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Insert a new row. Never upserts.
    pub async fn insert(&self, token: &StoredRefreshToken) -> StorageResult<()> {
        self.store
            .insert_one(REFRESH_TOKENS, to_document(REFRESH_TOKENS, token)?)
            .await?;
        Ok(())
    }

    pub async fn get(&self, token_id: &str) -> StorageResult<Option<StoredRefreshToken>> {
        self.store
            .find_one(REFRESH_TOKENS, &Filter::eq("token_id", token_id))
            .await?
            .map(|document| from_document(REFRESH_TOKENS, document))
            .transpose()
    }

    /// Set `revoked = true`. Idempotent; returns whether a row matched.
    pub async fn revoke(&self, token_id: &str) -> StorageResult<bool> {
        let mut changes = Document::new();
        changes.insert("revoked".to_string(), json!(true));
        let outcome = self
            .store
            .update_one(
                REFRESH_TOKENS,
                &Filter::eq("token_id", Value::from(token_id)),
                changes,
            )
            .await?;
        Ok(outcome.matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDocumentStore;
    use chrono::{Duration, TimeZone};

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 16, 4, 27, 20).unwrap()
    }

    fn token(id: &str) -> StoredRefreshToken {
        StoredRefreshToken {
            token_id: id.to_string(),
            user_id: "user-1".to_string(),
            expires_at: issued_at() + Duration::days(7),
            created_at: issued_at(),
            revoked: false,
        }
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryDocumentStore::new();
        let repo = RefreshTokenRepository::new(&store);
        repo.insert(&token("t1")).await.unwrap();

        assert_eq!(repo.get("t1").await.unwrap(), Some(token("t1")));
        assert_eq!(repo.get("t2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let store = InMemoryDocumentStore::new();
        let repo = RefreshTokenRepository::new(&store);
        repo.insert(&token("t1")).await.unwrap();

        assert!(repo.revoke("t1").await.unwrap());
        assert!(repo.revoke("t1").await.unwrap());
        assert!(!repo.revoke("missing").await.unwrap());

        let stored = repo.get("t1").await.unwrap().unwrap();
        assert!(stored.revoked);
        assert_eq!(store.count(REFRESH_TOKENS).await, 1);
    }
}
