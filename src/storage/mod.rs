// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Document Storage Module
//!
//! Durable state lives behind the [`DocumentStore`] trait: named collections
//! of JSON documents with equality filters, single-field sorting and limits.
//!
//! ## Implementations
//!
//! - [`FileDocumentStore`] - one JSON file per document under `DATA_DIR`
//! - [`InMemoryDocumentStore`] - process-local, used by tests
//! - [`TimeoutStore`] - wraps any store and bounds every call
//!
//! ## Storage Layout
//!
//! ```text
//! ./data/
//!   users/
//!     000000000001-{id}.json
//!   refresh_tokens/
//!   detections/
//!   logs/
//!   patients/
//!   .health_check
//! ```
//!
//! The numeric prefix is a process-wide insertion sequence, so listing a
//! collection directory in name order yields insertion order.

pub mod document;
pub mod json_fs;
pub mod memory;
pub mod paths;
pub mod repository;
pub mod timeout;

pub use document::{
    Document, DocumentStore, Filter, FindQuery, Sort, SortDirection, StorageError, StorageResult,
    UpdateOutcome, ID_FIELD,
};
pub use json_fs::FileDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use paths::StoragePaths;
pub use repository::{
    Bmi, DetectionRepository, DetectionRows, EmergencyContact, MedicalHistoryEntry, NewUser,
    PatientProfile, PatientRepository, PatientUpsert, RefreshTokenRepository,
    RequestLogRepository, StoredDetection, StoredPatient, StoredRefreshToken, StoredRequestLog,
    StoredUser, StoredVerdict, UserRepository, UserUpdate,
};
pub use timeout::{TimeoutStore, DEFAULT_STORE_TIMEOUT};
