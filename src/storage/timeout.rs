// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-call timeout for document store operations.
//!
//! Store calls are the main suspension points of a request. Wrapping the
//! store once here gives every repository the same budget, and an elapsed
//! budget surfaces as [`StorageError::Timeout`], distinct from a definitive
//! failure so callers can decide to retry. Nothing is retried here.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use super::document::{
    Document, DocumentStore, Filter, FindQuery, StorageError, StorageResult, UpdateOutcome,
};

/// Default per-call budget.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TimeoutStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: DocumentStore> TimeoutStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Document store call timed out"
                );
                Err(StorageError::Timeout { operation })
            }
        }
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for TimeoutStore<S> {
    async fn insert_one(&self, collection: &str, document: Document) -> StorageResult<String> {
        self.bounded("insert_one", self.inner.insert_one(collection, document))
            .await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        self.bounded("find_one", self.inner.find_one(collection, filter))
            .await
    }

    async fn find_many(&self, collection: &str, query: &FindQuery) -> StorageResult<Vec<Document>> {
        self.bounded("find_many", self.inner.find_many(collection, query))
            .await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        changes: Document,
    ) -> StorageResult<UpdateOutcome> {
        self.bounded(
            "update_one",
            self.inner.update_one(collection, filter, changes),
        )
        .await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StorageResult<bool> {
        self.bounded("delete_one", self.inner.delete_one(collection, filter))
            .await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.bounded("ping", self.inner.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDocumentStore;

    /// Store whose every call hangs far longer than any test budget.
    struct StalledStore;

    #[async_trait]
    impl DocumentStore for StalledStore {
        async fn insert_one(&self, _: &str, _: Document) -> StorageResult<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
        async fn find_one(&self, _: &str, _: &Filter) -> StorageResult<Option<Document>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
        async fn find_many(&self, _: &str, _: &FindQuery) -> StorageResult<Vec<Document>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
        async fn update_one(&self, _: &str, _: &Filter, _: Document) -> StorageResult<UpdateOutcome> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(UpdateOutcome { matched: false })
        }
        async fn delete_one(&self, _: &str, _: &Filter) -> StorageResult<bool> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(false)
        }
        async fn ping(&self) -> StorageResult<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_budget_maps_to_timeout_error() {
        let store = TimeoutStore::new(StalledStore, Duration::from_millis(50));
        let result = store.insert_one("detections", Document::new()).await;
        assert!(matches!(
            result,
            Err(StorageError::Timeout {
                operation: "insert_one"
            })
        ));
        assert!(store.ping().await.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let store = TimeoutStore::new(InMemoryDocumentStore::new(), DEFAULT_STORE_TIMEOUT);
        let id = store.insert_one("users", Document::new()).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.inner().count("users").await, 1);
    }
}
