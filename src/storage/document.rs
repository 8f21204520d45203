// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Document store abstraction.
//!
//! The store is schemaless: documents are JSON objects grouped into named
//! collections. Repositories convert between these maps and typed records,
//! so nothing above `storage::repository` ever touches a raw document.
//!
//! Implementations must make each single-document write atomic. No
//! cross-document transactions are assumed.

use std::cmp::Ordering;
use std::io;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// A stored document.
pub type Document = Map<String, Value>;

/// Field under which every store keeps the document identifier.
pub const ID_FIELD: &str = "_id";

/// Error type for document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored document could not be mapped to its typed record.
    #[error("Invalid document in {collection}: {reason}")]
    InvalidDocument { collection: String, reason: String },

    /// The store refused or could not complete the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer within the configured budget.
    #[error("Store operation `{operation}` timed out")]
    Timeout { operation: &'static str },
}

impl StorageError {
    pub fn invalid_document(collection: &str, reason: impl ToString) -> Self {
        StorageError::InvalidDocument {
            collection: collection.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StorageError::Timeout { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Conjunction of field equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Filter matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching documents whose `field` equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Add another equality condition.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Single-field sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Order two documents by this sort.
    ///
    /// Callers sort with a stable algorithm over documents in insertion
    /// order, so equal keys keep insertion order in both directions.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = compare_values(a.get(&self.field), b.get(&self.field));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Query for `find_many`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply sort and limit to documents already filtered and in insertion order.
    pub fn finish(&self, mut documents: Vec<Document>) -> Vec<Document> {
        if let Some(sort) = &self.sort {
            documents.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = self.limit {
            documents.truncate(limit);
        }
        documents
    }
}

/// Outcome of an `update_one` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: bool,
}

/// Abstract document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return its identifier.
    ///
    /// An `_id` is generated when the document carries none.
    async fn insert_one(&self, collection: &str, document: Document) -> StorageResult<String>;

    /// First document (in insertion order) matching the filter.
    async fn find_one(&self, collection: &str, filter: &Filter) -> StorageResult<Option<Document>>;

    async fn find_many(&self, collection: &str, query: &FindQuery) -> StorageResult<Vec<Document>>;

    /// Set the given fields on the first document matching the filter.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        changes: Document,
    ) -> StorageResult<UpdateOutcome>;

    /// Remove the first document matching the filter. Returns whether one was removed.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> StorageResult<bool>;

    /// Cheap liveness probe used by the health endpoints.
    async fn ping(&self) -> StorageResult<()>;
}

/// Make sure a document carries an `_id`, generating one if needed.
pub(crate) fn ensure_id(document: &mut Document) -> String {
    if let Some(Value::String(id)) = document.get(ID_FIELD) {
        return id.clone();
    }
    let id = uuid::Uuid::new_v4().simple().to_string();
    document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    id
}

/// Apply a field-level set.
pub(crate) fn apply_changes(document: &mut Document, changes: Document) {
    for (field, value) in changes {
        if field != ID_FIELD {
            document.insert(field, value);
        }
    }
}

/// Total order over optional JSON values: missing < null < bool < number < string.
/// Arrays and objects sort after strings and compare equal among themselves.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
