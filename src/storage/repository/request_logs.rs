// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request log repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collections::LOGS;
use super::to_document;
use crate::storage::{DocumentStore, StorageResult};

/// One served request. `duration` is in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRequestLog {
    pub path: String,
    pub method: String,
    pub timestamp: DateTime<Utc>,
    pub duration: f64,
    pub status_code: u16,
}

pub struct RequestLogRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> RequestLogRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub async fn insert(&self, entry: &StoredRequestLog) -> StorageResult<String> {
        self.store.insert_one(LOGS, to_document(LOGS, entry)?).await
    }
}
