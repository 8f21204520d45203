// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Detection record repository.
//!
//! Records are append-only. `detected_at` is written in the fixed-width
//! timestamp format so the store's string ordering matches time ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collections::DETECTIONS;
use super::{from_document, timestamp, to_document};
use crate::storage::{Document, DocumentStore, Filter, FindQuery, Sort, StorageResult};

/// Persisted `test_result` sub-document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredVerdict {
    pub confidence_score: f64,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Detection document. Key names are part of the persisted format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDetection {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub username: String,
    #[serde(with = "timestamp")]
    pub detected_at: DateTime<Utc>,
    pub model_version: String,
    pub input_type: String,
    pub test_result: StoredVerdict,
    pub overall_result: String,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

/// Listed detections, decoded one document per step.
///
/// A document that does not decode yields an error item; later items are
/// still returned.
pub struct DetectionRows {
    documents: std::vec::IntoIter<Document>,
}

impl Iterator for DetectionRows {
    type Item = StorageResult<StoredDetection>;

    fn next(&mut self) -> Option<Self::Item> {
        self.documents
            .next()
            .map(|document| from_document(DETECTIONS, document))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.documents.size_hint()
    }
}

impl ExactSizeIterator for DetectionRows {}

pub struct DetectionRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> DetectionRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Single insert, no read-before-write.
    pub async fn insert(&self, detection: &StoredDetection) -> StorageResult<()> {
        self.store
            .insert_one(DETECTIONS, to_document(DETECTIONS, detection)?)
            .await?;
        Ok(())
    }

    /// Newest first, at most `limit` records.
    pub async fn list_by_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StorageResult<DetectionRows> {
        let query = FindQuery::new(Filter::eq("user_id", user_id))
            .sort(Sort::descending("detected_at"))
            .limit(limit);
        let documents = self.store.find_many(DETECTIONS, &query).await?;
        Ok(DetectionRows {
            documents: documents.into_iter(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDocumentStore;
    use chrono::{Duration, TimeZone};

    fn detection(id: &str, user_id: &str, detected_at: DateTime<Utc>) -> StoredDetection {
        StoredDetection {
            id: id.to_string(),
            user_id: user_id.to_string(),
            username: format!("{user_id}@example.com"),
            detected_at,
            model_version: "v1.0".to_string(),
            input_type: "balance".to_string(),
            test_result: StoredVerdict {
                confidence_score: 1.0,
                result: "normal".to_string(),
                notes: None,
            },
            overall_result: "normal".to_string(),
            additional_notes: None,
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 16, 4, 27, 20).unwrap()
    }

    #[tokio::test]
    async fn lists_newest_first_for_one_user() {
        let store = InMemoryDocumentStore::new();
        let repo = DetectionRepository::new(&store);

        repo.insert(&detection("a", "u1", base())).await.unwrap();
        repo.insert(&detection("b", "u1", base() + Duration::seconds(2)))
            .await
            .unwrap();
        repo.insert(&detection("c", "u2", base() + Duration::seconds(5)))
            .await
            .unwrap();
        repo.insert(&detection("d", "u1", base() + Duration::milliseconds(1500)))
            .await
            .unwrap();

        let ids: Vec<String> = repo
            .list_by_user("u1", 10)
            .await
            .unwrap()
            .map(|d| d.unwrap().id)
            .collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[tokio::test]
    async fn ties_keep_insertion_order_and_limit_applies() {
        let store = InMemoryDocumentStore::new();
        let repo = DetectionRepository::new(&store);

        for id in ["first", "second", "third"] {
            repo.insert(&detection(id, "u1", base())).await.unwrap();
        }

        let ids: Vec<String> = repo
            .list_by_user("u1", 2)
            .await
            .unwrap()
            .map(|d| d.unwrap().id)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn undecodable_document_does_not_hide_the_rest() {
        let store = InMemoryDocumentStore::new();
        let repo = DetectionRepository::new(&store);
        repo.insert(&detection("good", "u1", base())).await.unwrap();

        let mut broken = to_document(DETECTIONS, &detection("bad", "u1", base() + Duration::seconds(1)))
            .unwrap();
        broken.remove("test_result");
        store.insert_one(DETECTIONS, broken).await.unwrap();

        let rows: Vec<_> = repo.list_by_user("u1", 10).await.unwrap().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_err());
        assert_eq!(rows[1].as_ref().unwrap().id, "good");
    }

    #[tokio::test]
    async fn persisted_keys_are_stable() {
        let document = to_document(DETECTIONS, &detection("a", "u1", base())).unwrap();
        for key in [
            "user_id",
            "username",
            "detected_at",
            "model_version",
            "input_type",
            "test_result",
            "overall_result",
            "additional_notes",
        ] {
            assert!(document.contains_key(key), "missing {key}");
        }
        assert_eq!(document["detected_at"], "2025-05-16T04:27:20.000000Z");
    }
}
