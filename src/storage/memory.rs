// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process document store.
//!
//! Used by tests and by local development runs that do not need data to
//! survive a restart. Collections are vectors in insertion order.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::document::{
    apply_changes, ensure_id, Document, DocumentStore, Filter, FindQuery, StorageResult,
    UpdateOutcome,
};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_one(&self, collection: &str, mut document: Document) -> StorageResult<String> {
        let id = ensure_id(&mut document);
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn find_many(&self, collection: &str, query: &FindQuery) -> StorageResult<Vec<Document>> {
        let matching = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|d| query.filter.matches(d))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(query.finish(matching))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        changes: Document,
    ) -> StorageResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d)));

        match target {
            Some(document) => {
                apply_changes(document, changes);
                Ok(UpdateOutcome { matched: true })
            }
            None => Ok(UpdateOutcome { matched: false }),
        }
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> StorageResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        match docs.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                docs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
