// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::analysis::{BalanceAnalyzer, HttpSpeechClassifier, SpeechAnalyzer};
use crate::auth::{SessionEngine, TokenSigner};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::detection::{DetectionAggregator, ModelVersions};
use crate::notify::{DisabledSender, NotificationSender, NotifyError, TwilioSender};
use crate::storage::DocumentStore;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to build speech classifier: {0}")]
    Classifier(#[from] crate::analysis::AnalysisError),
    #[error("Failed to build notification sender: {0}")]
    Notifier(#[from] NotifyError),
}

/// Process-wide services, built once and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
    pub sessions: SessionEngine,
    pub detections: DetectionAggregator,
    pub balance: BalanceAnalyzer,
    pub speech: SpeechAnalyzer,
    pub notifier: Arc<dyn NotificationSender>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        signer: TokenSigner,
        versions: ModelVersions,
        balance: BalanceAnalyzer,
        speech: SpeechAnalyzer,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            sessions: SessionEngine::new(store.clone(), signer, clock.clone()),
            detections: DetectionAggregator::new(store.clone(), clock.clone(), versions),
            store,
            clock,
            balance,
            speech,
            notifier,
        }
    }

    /// Wire every service from configuration over the given store.
    pub fn from_config(config: &AppConfig, store: Arc<dyn DocumentStore>) -> Result<Self, StateError> {
        let signer = TokenSigner::new(
            config.jwt_secret.as_bytes(),
            config.jwt_algorithm,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );

        let speech = match &config.classifier_url {
            Some(url) => SpeechAnalyzer::new(
                Arc::new(HttpSpeechClassifier::new(url.clone())?),
                config.classifier_timeout,
            ),
            None => {
                tracing::warn!("CLASSIFIER_URL not set; speech analysis disabled");
                SpeechAnalyzer::unavailable()
            }
        };

        let notifier: Arc<dyn NotificationSender> = match &config.twilio {
            Some(twilio) => Arc::new(TwilioSender::new(twilio.clone())?),
            None => {
                tracing::warn!("Twilio not configured; emergency alerts disabled");
                Arc::new(DisabledSender)
            }
        };

        let versions = ModelVersions {
            speech: config.speech_model_version.clone(),
            ..ModelVersions::default()
        };

        Ok(Self::new(
            store,
            Arc::new(SystemClock),
            signer,
            versions,
            BalanceAnalyzer::new(config.balance_thresholds, config.balance_rule_confidence),
            speech,
            notifier,
        ))
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory state with no classifier and no notification provider.
    pub fn for_tests() -> Self {
        Self::new(
            Arc::new(crate::storage::InMemoryDocumentStore::new()),
            Arc::new(SystemClock),
            TokenSigner::new(
                b"test-secret",
                jsonwebtoken::Algorithm::HS256,
                chrono::Duration::minutes(30),
                chrono::Duration::days(7),
            ),
            ModelVersions::default(),
            BalanceAnalyzer::default(),
            SpeechAnalyzer::unavailable(),
            Arc::new(DisabledSender),
        )
    }
}
