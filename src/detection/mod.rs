// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Detection Aggregation
//!
//! Every screening modality ends in a [`Verdict`]. The aggregator stamps it
//! with time, user and model version, persists it as a [`DetectionRecord`]
//! and serves per-user history newest first.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::storage::{StorageError, StoredDetection, StoredVerdict};

pub mod aggregator;

pub use aggregator::{DetectionAggregator, DetectionHistory, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};

/// The kind of test a record originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Balance,
    SlurredSpeech,
    Eye,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Balance => "balance",
            Modality::SlurredSpeech => "slurred_speech",
            Modality::Eye => "eye",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balance" => Ok(Modality::Balance),
            "slurred_speech" => Ok(Modality::SlurredSpeech),
            "eye" => Ok(Modality::Eye),
            other => Err(format!("unknown input type `{other}`")),
        }
    }
}

/// Screening outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    StrokeDetected,
    Normal,
}

impl Classification {
    pub fn from_flag(stroke_detected: bool) -> Self {
        if stroke_detected {
            Classification::StrokeDetected
        } else {
            Classification::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::StrokeDetected => "stroke_detected",
            Classification::Normal => "normal",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stroke_detected" => Ok(Classification::StrokeDetected),
            "normal" => Ok(Classification::Normal),
            other => Err(format!("unknown result `{other}`")),
        }
    }
}

/// Label, confidence and optional note produced by an analysis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub classification: Classification,
    /// In `[0, 1]`; checked when recorded.
    pub confidence: f64,
    pub notes: Option<String>,
}

impl Verdict {
    pub fn new(classification: Classification, confidence: f64) -> Self {
        Self {
            classification,
            confidence,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// `test_result` block of a detection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TestResult {
    pub confidence_score: f64,
    pub result: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Canonical, persisted outcome of one screening test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DetectionRecord {
    pub user_id: String,
    pub username: String,
    pub input_type: Modality,
    #[serde(with = "crate::storage::repository::timestamp")]
    #[schema(value_type = String, format = DateTime)]
    pub detected_at: DateTime<Utc>,
    pub model_version: String,
    pub test_result: TestResult,
    pub overall_result: Classification,
    pub additional_notes: Option<String>,
}

impl DetectionRecord {
    pub(crate) fn to_stored(&self, id: String) -> StoredDetection {
        StoredDetection {
            id,
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            detected_at: self.detected_at,
            model_version: self.model_version.clone(),
            input_type: self.input_type.as_str().to_string(),
            test_result: StoredVerdict {
                confidence_score: self.test_result.confidence_score,
                result: self.test_result.result.as_str().to_string(),
                notes: self.test_result.notes.clone(),
            },
            overall_result: self.overall_result.as_str().to_string(),
            additional_notes: self.additional_notes.clone(),
        }
    }
}

impl TryFrom<StoredDetection> for DetectionRecord {
    type Error = DetectionError;

    fn try_from(stored: StoredDetection) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| {
            DetectionError::Persistence(StorageError::invalid_document(
                crate::storage::repository::collections::DETECTIONS,
                reason,
            ))
        };
        Ok(Self {
            user_id: stored.user_id,
            username: stored.username,
            input_type: stored.input_type.parse().map_err(corrupt)?,
            detected_at: stored.detected_at,
            model_version: stored.model_version,
            test_result: TestResult {
                confidence_score: stored.test_result.confidence_score,
                result: stored.test_result.result.parse().map_err(corrupt)?,
                notes: stored.test_result.notes,
            },
            overall_result: stored.overall_result.parse().map_err(corrupt)?,
            additional_notes: stored.additional_notes,
        })
    }
}

/// Model version recorded per modality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVersions {
    pub balance: String,
    pub speech: String,
    pub eye: String,
}

impl ModelVersions {
    pub fn for_modality(&self, modality: Modality) -> &str {
        match modality {
            Modality::Balance => &self.balance,
            Modality::SlurredSpeech => &self.speech,
            Modality::Eye => &self.eye,
        }
    }
}

impl Default for ModelVersions {
    fn default() -> Self {
        Self {
            balance: "v1.0".to_string(),
            speech: "v1.0".to_string(),
            eye: "v1.0".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Invalid verdict: {0}")]
    InvalidVerdict(String),
    #[error("Detection persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn labels_use_persisted_spelling() {
        assert_eq!(
            serde_json::to_value(Modality::SlurredSpeech).unwrap(),
            "slurred_speech"
        );
        assert_eq!(
            serde_json::to_value(Classification::StrokeDetected).unwrap(),
            "stroke_detected"
        );
        assert_eq!("eye".parse::<Modality>().unwrap(), Modality::Eye);
        assert!("gait".parse::<Modality>().is_err());
    }

    #[test]
    fn stored_round_trip_keeps_fields() {
        let record = DetectionRecord {
            user_id: "u1".to_string(),
            username: "u1@example.com".to_string(),
            input_type: Modality::Balance,
            detected_at: Utc.with_ymd_and_hms(2025, 5, 16, 4, 27, 20).unwrap(),
            model_version: "v1.0".to_string(),
            test_result: TestResult {
                confidence_score: 1.0,
                result: Classification::Normal,
                notes: Some("ok".to_string()),
            },
            overall_result: Classification::Normal,
            additional_notes: Some("ok".to_string()),
        };
        let stored = record.to_stored("id1".to_string());
        assert_eq!(stored.input_type, "balance");
        assert_eq!(DetectionRecord::try_from(stored).unwrap(), record);
    }

    #[test]
    fn unknown_stored_label_is_a_persistence_error() {
        let mut stored = DetectionRecord {
            user_id: "u1".to_string(),
            username: "u1".to_string(),
            input_type: Modality::Eye,
            detected_at: Utc::now(),
            model_version: "v1.0".to_string(),
            test_result: TestResult {
                confidence_score: 0.5,
                result: Classification::Normal,
                notes: None,
            },
            overall_result: Classification::Normal,
            additional_notes: None,
        }
        .to_stored("id".to_string());
        stored.overall_result = "maybe".to_string();

        assert!(matches!(
            DetectionRecord::try_from(stored),
            Err(DetectionError::Persistence(_))
        ));
    }
}
