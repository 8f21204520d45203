// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Screening Analysis
//!
//! One engine per modality, each turning raw input into a
//! [`Verdict`](crate::detection::Verdict):
//!
//! - `balance` - fixed-rule classifier over accelerometer and gyroscope
//!   samples (pure, no I/O)
//! - `speech` - adapter for an external audio classifier
//! - `eye` - tally of matched gaze directions (pure)

use thiserror::Error;

pub mod balance;
pub mod eye;
pub mod speech;

pub use balance::{BalanceAnalyzer, BalanceFeatures, BalanceReport, BalanceThresholds, MotionSample};
pub use eye::{GazeTally, DEFAULT_GAZE_DIRECTIONS};
pub use speech::{HttpSpeechClassifier, SpeechAnalyzer, SpeechClassification, SpeechClassifier};

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Input too short, mismatched or otherwise unusable.
    #[error("{0}")]
    InsufficientData(String),
    #[error("Speech classifier is not configured")]
    ClassifierUnavailable,
    #[error("Speech classifier failed: {0}")]
    Classifier(String),
    #[error("Speech classifier returned an invalid result: {0}")]
    InvalidClassifierOutput(String),
    #[error("Speech classifier did not answer within {0:?}")]
    UpstreamTimeout(std::time::Duration),
}

impl AnalysisError {
    pub fn insufficient(detail: impl Into<String>) -> Self {
        AnalysisError::InsufficientData(detail.into())
    }
}
