// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisting verdicts and reading them back.

use std::sync::Arc;

use super::{DetectionError, DetectionRecord, Modality, ModelVersions, TestResult, Verdict};
use crate::clock::Clock;
use crate::storage::repository::timestamp;
use crate::storage::{DetectionRepository, DetectionRows, DocumentStore};

/// History length when the caller does not ask for one.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Largest history page the API hands out.
pub const MAX_HISTORY_LIMIT: usize = 200;

/// Single-pass iterator over a user's records, newest first.
///
/// Documents are converted one at a time as the iterator advances; a
/// document that cannot be read yields an error item without ending the
/// iteration.
pub struct DetectionHistory {
    inner: DetectionRows,
}

impl Iterator for DetectionHistory {
    type Item = Result<DetectionRecord, DetectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|stored| DetectionRecord::try_from(stored?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for DetectionHistory {}

#[derive(Clone)]
pub struct DetectionAggregator {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    versions: ModelVersions,
}

impl DetectionAggregator {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, versions: ModelVersions) -> Self {
        Self {
            store,
            clock,
            versions,
        }
    }

    /// Normalize a verdict into a record and persist it.
    pub async fn record(
        &self,
        user_id: &str,
        username: &str,
        modality: Modality,
        verdict: Verdict,
    ) -> Result<DetectionRecord, DetectionError> {
        if !verdict.confidence.is_finite() || !(0.0..=1.0).contains(&verdict.confidence) {
            return Err(DetectionError::InvalidVerdict(format!(
                "confidence {} is outside [0, 1]",
                verdict.confidence
            )));
        }

        let record = DetectionRecord {
            user_id: user_id.to_string(),
            username: username.to_string(),
            input_type: modality,
            detected_at: timestamp::truncate(self.clock.now()),
            model_version: self.versions.for_modality(modality).to_string(),
            test_result: TestResult {
                confidence_score: verdict.confidence,
                result: verdict.classification,
                notes: verdict.notes.clone(),
            },
            overall_result: verdict.classification,
            additional_notes: verdict.notes,
        };

        let id = uuid::Uuid::new_v4().simple().to_string();
        DetectionRepository::new(self.store.as_ref())
            .insert(&record.to_stored(id))
            .await
            .inspect_err(|e| {
                tracing::error!(user_id, modality = %modality, error = %e, "failed to persist detection")
            })?;

        tracing::info!(
            user_id,
            modality = %modality,
            result = %record.overall_result,
            "detection recorded"
        );
        Ok(record)
    }

    /// A user's records, newest first, at most `limit` of them.
    pub async fn history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<DetectionHistory, DetectionError> {
        let rows = DetectionRepository::new(self.store.as_ref())
            .list_by_user(user_id, limit)
            .await?;
        Ok(DetectionHistory { inner: rows })
    }
}
